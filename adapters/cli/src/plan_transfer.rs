//! Single-line encoding of a placed plan, for sharing between machines.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use evacsim_core::{CellCoord, Grid};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const TRANSFER_DOMAIN: &str = "evac";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded plan payload.
pub(crate) const TRANSFER_HEADER: &str = "evac:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Grid plus the exits and assembly point placed on it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct PlanTransfer {
    pub(crate) grid: Grid,
    pub(crate) exits: Vec<CellCoord>,
    #[serde(default)]
    pub(crate) assembly: Option<CellCoord>,
}

/// Errors that can occur while decoding plan strings.
#[derive(Debug, Error)]
pub(crate) enum TransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("plan string was empty")]
    EmptyPayload,
    /// The plan string did not contain a version segment.
    #[error("plan string is missing the version")]
    MissingVersion,
    /// The plan string did not include grid dimensions.
    #[error("plan string is missing the grid dimensions")]
    MissingDimensions,
    /// The plan string did not include the payload segment.
    #[error("plan string is missing the payload")]
    MissingPayload,
    /// The plan string used an unexpected prefix segment.
    #[error("plan prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The plan string used an unsupported version identifier.
    #[error("plan version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the header.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The header dimensions disagree with the decoded grid.
    #[error("header says {expected} but the grid is {actual}")]
    DimensionMismatch { expected: String, actual: String },
    /// The base64 payload could not be decoded.
    #[error("could not decode plan payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The decoded payload could not be deserialised.
    #[error("could not parse plan payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    /// The plan could not be serialised for encoding.
    #[error("could not serialize plan: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl PlanTransfer {
    /// Encodes the plan into `evac:v1:<W>x<H>:<payload>`.
    pub(crate) fn encode(&self) -> Result<String, TransferError> {
        let json = serde_json::to_vec(self).map_err(TransferError::Serialize)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{TRANSFER_HEADER}:{}x{}:{encoded}",
            self.grid.columns(),
            self.grid.rows()
        ))
    }

    /// Decodes a plan, checking the header dimensions against the grid.
    pub(crate) fn decode(value: &str) -> Result<Self, TransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(TransferError::EmptyPayload);
        }

        let mut parts = trimmed.splitn(4, FIELD_DELIMITER);
        let domain = parts.next().ok_or(TransferError::EmptyPayload)?;
        let version = parts.next().ok_or(TransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(TransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(TransferError::MissingPayload)?;

        if domain != TRANSFER_DOMAIN {
            return Err(TransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != TRANSFER_VERSION {
            return Err(TransferError::UnsupportedVersion(version.to_owned()));
        }

        let (columns, rows) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(TransferError::InvalidEncoding)?;
        let plan: Self = serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

        if plan.grid.columns() != columns || plan.grid.rows() != rows {
            return Err(TransferError::DimensionMismatch {
                expected: format!("{columns}x{rows}"),
                actual: format!("{}x{}", plan.grid.columns(), plan.grid.rows()),
            });
        }
        Ok(plan)
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TransferError> {
    let invalid = || TransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
