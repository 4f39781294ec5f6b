//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{
    IngestResponse, PaginationMeta, SessionListResponse, SessionSummaryDto, StatsResponse,
};
use super::handlers::{ingest, replay, session, system};
use crate::error::{ErrorBody, ResponseStatus};

/// Generated OpenAPI document served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "clearsight",
        description = "Session recording ingestion and replay API."
    ),
    paths(
        ingest::ingest_event,
        session::list_sessions,
        session::get_session,
        session::stats,
        replay::get_replay,
        replay::get_frame,
        system::health_handler,
        system::event_types_handler,
    ),
    components(schemas(
        ErrorBody,
        ResponseStatus,
        IngestResponse,
        PaginationMeta,
        SessionListResponse,
        SessionSummaryDto,
        StatsResponse,
        system::HealthResponse,
        system::EventTypeInfo,
    )),
    tags(
        (name = "Ingestion", description = "Telemetry intake over HTTP"),
        (name = "Sessions", description = "Session listings and dashboard"),
        (name = "Replay", description = "Replay documents and frames"),
        (name = "System", description = "Health and configuration"),
    )
)]
pub struct ApiDoc;
