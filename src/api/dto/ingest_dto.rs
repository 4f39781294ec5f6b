//! Ingestion response DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::SessionId;
use crate::error::ResponseStatus;
use crate::service::IngestOutcome;

/// Response body for `POST /api/v1/events`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestResponse {
    /// Always `success`.
    pub status: ResponseStatus,
    /// Identifier of a newly created session. Absent for plain events.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<uuid::Uuid>)]
    pub session_id: Option<SessionId>,
    /// Tag of the recorded event. Absent for `session_start`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::SessionStarted(id) => Self {
                status: ResponseStatus::Success,
                session_id: Some(id),
                event_type: None,
            },
            IngestOutcome::EventRecorded { kind, .. } => Self {
                status: ResponseStatus::Success,
                session_id: None,
                event_type: Some(kind.as_str().to_string()),
            },
        }
    }
}
