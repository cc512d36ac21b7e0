//! Persistable wizard state.

use evacsim_core::{CellCoord, Exit, Grid, SimulationResult, Stage};
use serde::{Deserialize, Serialize};

use crate::SetupConfig;

/// Serializable copy of a [`crate::Session`], stored between runs of the tool.
///
/// A running job is never persisted; its stage is saved as setup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    /// Stage to resume in.
    pub stage: Stage,
    /// Processed grid.
    #[serde(default)]
    pub grid: Option<Grid>,
    /// Original floor-plan PNG, base64 encoded on disk.
    #[serde(default, with = "base64_bytes")]
    pub background: Option<Vec<u8>>,
    /// Placed exits.
    #[serde(default)]
    pub exits: Vec<Exit>,
    /// Next identifier to hand out.
    #[serde(default)]
    pub next_exit_id: u32,
    /// Assembly point.
    #[serde(default)]
    pub assembly_point: Option<CellCoord>,
    /// Simulation setup.
    #[serde(default)]
    pub setup: SetupConfig,
    /// Last engine result.
    #[serde(default)]
    pub result: Option<SimulationResult>,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?;
        encoded
            .map(|text| STANDARD.decode(text.as_bytes()).map_err(D::Error::custom))
            .transpose()
    }
}
