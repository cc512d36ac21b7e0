#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Clients for the external services the planner depends on.
//!
//! The evacuation engine, the image-to-grid service and the floor-plan API
//! are reached through the [`SimulationService`], [`ImageGridService`] and
//! [`FloorPlanRepository`] traits. HTTP implementations live in [`http`];
//! tests substitute in-process fakes. [`JobOrchestrator`] drives one
//! submit-and-poll lifecycle at a time on top of a [`SimulationService`].

mod floor_plans;
pub mod http;
mod imaging;
mod job;

use thiserror::Error;

pub use floor_plans::{
    FloorPlanPage, FloorPlanRecord, FloorPlanRepository, FloorPlanSummary, FloorPlanUpdate,
    ListFilter, ListQuery, NewFloorPlan, Pagination,
};
pub use imaging::{
    decode_data_url, encode_data_url, process_floor_plan, GridSize, ImageGridService, ImageKind,
    ImageUpload, ProcessImageResponse, ProcessedFloorPlan, UploadError, MAX_UPLOAD_BYTES,
};
pub use job::{
    into_command, poll_job, JobError, JobHandle, JobOrchestrator, JobState, PollSettings,
    SimulationService, DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL,
};

/// Failure talking to an external service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service requires authentication.
    #[error("authentication required")]
    Unauthorized,
    /// The caller may not access the resource.
    #[error("access denied")]
    Forbidden,
    /// The resource does not exist.
    #[error("not found")]
    NotFound,
    /// Any other non-success status.
    #[error("service returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the raw body.
        message: String,
    },
    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The upload was refused before any request was made.
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ServiceError {
    /// Maps a non-success status and its body onto an error.
    ///
    /// The message is the JSON `error` field when present, otherwise the
    /// trimmed body.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            _ => {
                let message = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|value| value.get("error")?.as_str().map(str::to_owned))
                    .unwrap_or_else(|| body.trim().to_owned());
                Self::Http { status, message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceError;

    #[test]
    fn status_mapping_prefers_json_error_field() {
        assert!(matches!(
            ServiceError::from_status(401, ""),
            ServiceError::Unauthorized
        ));
        assert!(matches!(
            ServiceError::from_status(403, "{}"),
            ServiceError::Forbidden
        ));
        assert!(matches!(
            ServiceError::from_status(404, ""),
            ServiceError::NotFound
        ));
        match ServiceError::from_status(400, r#"{"error":"Name and gridData are required"}"#) {
            ServiceError::Http { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Name and gridData are required");
            }
            other => panic!("unexpected error {other:?}"),
        }
        match ServiceError::from_status(502, " bad gateway \n") {
            ServiceError::Http { message, .. } => assert_eq!(message, "bad gateway"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
