//! Image to grid conversion.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use evacsim_core::{Grid, GridCorrection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::ServiceError;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Accepted upload formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    /// Portable Network Graphics.
    Png,
    /// JPEG.
    Jpeg,
}

impl ImageKind {
    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    const JPEG_MAGIC: [u8; 3] = [0xff, 0xd8, 0xff];

    /// Detects the format from the leading bytes.
    #[must_use]
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&Self::PNG_MAGIC) {
            Some(Self::Png)
        } else if bytes.starts_with(&Self::JPEG_MAGIC) {
            Some(Self::Jpeg)
        } else {
            None
        }
    }

    /// MIME type sent with the upload.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }
}

/// Reasons an upload is refused locally.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UploadError {
    /// No bytes were provided.
    #[error("no file provided")]
    Empty,
    /// The bytes are neither PNG nor JPEG.
    #[error("invalid file type, only JPEG and PNG are supported")]
    UnsupportedType,
    /// The file exceeds [`MAX_UPLOAD_BYTES`].
    #[error("file size {size} exceeds the {max} byte limit")]
    TooLarge {
        /// Size of the file.
        size: usize,
        /// Limit.
        max: usize,
    },
}

/// Validated floor-plan image ready to upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageUpload {
    file_name: String,
    kind: ImageKind,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Validates the file's size and format.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }
        let kind = ImageKind::detect(&bytes).ok_or(UploadError::UnsupportedType)?;
        Ok(Self {
            file_name: file_name.into(),
            kind,
            bytes,
        })
    }

    /// Original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Detected format.
    #[must_use]
    pub const fn kind(&self) -> ImageKind {
        self.kind
    }

    /// File contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Grid dimensions reported by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
}

/// Raw body returned by the image-to-grid service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessImageResponse {
    /// Detected occupancy grid.
    pub grid: Grid,
    /// Resized source image as a base64 data URL.
    pub original_image: String,
    /// Grid dimensions.
    pub grid_size: GridSize,
}

/// Image-to-grid service endpoint.
#[async_trait]
pub trait ImageGridService: Send + Sync {
    /// Uploads an image and returns the detected grid.
    async fn process_image(
        &self,
        upload: &ImageUpload,
    ) -> Result<ProcessImageResponse, ServiceError>;
}

/// Grid and background ready to load into a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedFloorPlan {
    /// Grid after the inversion heuristic.
    pub grid: Grid,
    /// Decoded background image bytes.
    pub background: Vec<u8>,
    /// Whether free and wall codes were swapped.
    pub inverted: bool,
}

impl ProcessedFloorPlan {
    /// Decodes the background and applies `correction` to the grid.
    pub fn from_response(
        response: ProcessImageResponse,
        correction: GridCorrection,
    ) -> Result<Self, ServiceError> {
        let background = decode_data_url(&response.original_image)?;
        let (grid, inverted) = correction.apply(response.grid);
        if inverted {
            info!(
                columns = grid.columns(),
                rows = grid.rows(),
                "wall fraction above threshold, grid inverted"
            );
        }
        Ok(Self {
            grid,
            background,
            inverted,
        })
    }
}

/// Uploads the image and prepares the result for the session.
pub async fn process_floor_plan(
    service: &dyn ImageGridService,
    upload: &ImageUpload,
    correction: GridCorrection,
) -> Result<ProcessedFloorPlan, ServiceError> {
    let response = service.process_image(upload).await?;
    ProcessedFloorPlan::from_response(response, correction)
}

/// Decodes a `data:<mime>;base64,<payload>` URL, or a bare base64 payload.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, ServiceError> {
    let payload = match url.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                ServiceError::InvalidResponse("data URL has no payload".to_owned())
            })?;
            if !header.ends_with(";base64") {
                return Err(ServiceError::InvalidResponse(format!(
                    "data URL is not base64 encoded: {header}"
                )));
            }
            payload
        }
        None => url,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|error| ServiceError::InvalidResponse(format!("invalid base64 image: {error}")))
}

/// Encodes bytes as a data URL with the provided MIME type.
#[must_use]
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}
