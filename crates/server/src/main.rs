// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all
)]
#![allow(clippy::multiple_crate_versions)]

mod identity;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State as AxumState},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use clap::Parser;
use hse_permit_api::{
    AddAttachmentRequest, ApiError, ApprovalStatusResponse, ApproveRequest, AttachmentContent,
    AuditEventInfo, AuditTimelineResponse, CancelRequest, CancellationSignal,
    CompletePrecautionRequest,
    CompleteWorkRequest, CreatePermitRequest, DeletePermitResponse, FsAttachmentStore,
    HazardRequest, ImplementControlsRequest, ListPermitsRequest, ListPermitsResponse,
    MAX_ATTACHMENT_BYTES, PermitResponse, PermitService, PrecautionRequest, RejectRequest,
    UpdatePermitRequest, WriteResponse,
};
use hse_permit_domain::ApprovalPolicy;
use hse_permit_persistence::Persistence;
use serde::{Deserialize, Serialize};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::identity::Caller;

/// HSE Permit Server - HTTP server for the work-permit workflow
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the `SQLite` database file. If not provided, uses in-memory database.
    #[arg(short, long)]
    database: Option<String>,

    /// Port to bind the server to
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Address to bind the server to
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Directory where attachment files are stored
    #[arg(long, default_value = "attachments")]
    attachments_dir: PathBuf,

    /// JSON file with the approval policy. Uses the built-in policy if not provided.
    #[arg(long)]
    approval_policy: Option<PathBuf>,

    /// Tracing filter, e.g. `info` or `hse_permit_api=debug`. Overrides `RUST_LOG`.
    #[arg(long)]
    log_filter: Option<String>,

    /// Seconds a request may run before it is cancelled
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,
}

/// Application state shared across handlers.
///
/// The permit service owns the record store connection, so it is wrapped
/// in a Mutex to serialise access to it. Service calls block, so they run
/// on tokio's blocking pool rather than on a runtime worker.
#[derive(Clone)]
pub struct AppState {
    service: Arc<Mutex<PermitService>>,
    request_timeout: Duration,
}

impl AppState {
    fn new(service: PermitService, request_timeout: Duration) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            request_timeout,
        }
    }

    /// Runs a command against the service on the blocking pool.
    ///
    /// `cancellation` is tripped when the request timeout elapses or when
    /// the handler future is dropped because the client went away. The
    /// service only honours it before applying and before committing, so
    /// after a timeout the task is still awaited and its real outcome is
    /// returned: either `Cancelled` or the committed result.
    async fn run<T, F>(
        &self,
        cancellation: CancellationSignal,
        operation: F,
    ) -> Result<T, HttpError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PermitService) -> Result<T, ApiError> + Send + 'static,
    {
        let service: Arc<Mutex<PermitService>> = Arc::clone(&self.service);
        let on_disconnect: CancelOnDrop = CancelOnDrop(Some(cancellation.clone()));
        let mut task = tokio::task::spawn_blocking(move || {
            let mut guard = service.blocking_lock();
            operation(&mut *guard)
        });

        let timed = tokio::time::timeout(self.request_timeout, &mut task).await;
        let joined = if let Ok(joined) = timed {
            joined
        } else {
            warn!(timeout = ?self.request_timeout, "Request timed out, cancelling");
            cancellation.cancel();
            task.await
        };
        on_disconnect.disarm();

        let result: Result<T, ApiError> = joined.map_err(|e| ApiError::StorageFailure {
            message: format!("Permit service task failed: {e}"),
        })?;
        result.map_err(HttpError::from)
    }

    /// Runs a read-only query against the service on the blocking pool.
    async fn query<T, F>(&self, operation: F) -> Result<T, HttpError>
    where
        T: Send + 'static,
        F: FnOnce(&mut PermitService) -> Result<T, ApiError> + Send + 'static,
    {
        self.run(CancellationSignal::new(), operation).await
    }
}

/// Cancels the request's signal if dropped before it is disarmed.
struct CancelOnDrop(Option<CancellationSignal>);

impl CancelOnDrop {
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(signal) = self.0.take() {
            signal.cancel();
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ErrorResponse {
    /// Error indicator.
    error: bool,
    /// Machine-readable error kind.
    kind: String,
    /// Error message.
    message: String,
    /// The offending field, for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

/// HTTP error wrapper that implements `IntoResponse`.
pub struct HttpError {
    /// The HTTP status code.
    status: StatusCode,
    body: ErrorResponse,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        let (status, kind, field): (StatusCode, &str, Option<String>) = match &err {
            ApiError::AuthenticationFailed { .. } => {
                (StatusCode::UNAUTHORIZED, "authentication_failed", None)
            }
            ApiError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", None),
            ApiError::InvalidTransition { .. } => {
                (StatusCode::CONFLICT, "invalid_transition", None)
            }
            ApiError::ValidationFailure { field, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failure",
                Some(field.clone()),
            ),
            ApiError::ConcurrencyConflict { .. } => {
                (StatusCode::CONFLICT, "concurrency_conflict", None)
            }
            ApiError::StorageBusy { .. } => {
                warn!(error = %err, "Storage busy");
                (StatusCode::SERVICE_UNAVAILABLE, "storage_busy", None)
            }
            ApiError::StorageFailure { .. } => {
                error!(error = %err, "Storage failure");
                (StatusCode::SERVICE_UNAVAILABLE, "storage_failure", None)
            }
            ApiError::IoFailure { .. } => {
                error!(error = %err, "Attachment storage failure");
                (StatusCode::SERVICE_UNAVAILABLE, "io_failure", None)
            }
            ApiError::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled", None),
        };

        Self {
            status,
            body: ErrorResponse {
                error: true,
                kind: kind.to_string(),
                message: err.to_string(),
                field,
            },
        }
    }
}

/// Query parameters for an attachment upload. The body is the raw file.
#[derive(Debug, Deserialize)]
struct UploadQuery {
    file_name: String,
    description: Option<String>,
}

// ----------------------------------------------------------------------
// Permits
// ----------------------------------------------------------------------

/// Handler for POST `/permits` endpoint.
async fn handle_create_permit(
    AxumState(app_state): AxumState<AppState>,
    Caller(ctx): Caller,
    Json(req): Json<CreatePermitRequest>,
) -> Result<(StatusCode, Json<WriteResponse>), HttpError> {
    info!(
        actor_id = %ctx.user.id,
        permit_type = %req.permit_type,
        "Handling create_permit request"
    );

    let response: WriteResponse = app_state
        .run(ctx.cancellation.clone(), move |service| {
            service.create_permit(&ctx, &req)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET `/permits` endpoint.
///
/// Lists permits filtered by the optional `status`, `permit_type`,
/// `requestor_id` and `limit` query parameters.
async fn handle_list_permits(
    AxumState(app_state): AxumState<AppState>,
    Query(query): Query<ListPermitsRequest>,
) -> Result<Json<ListPermitsResponse>, HttpError> {
    Ok(Json(
        app_state
            .query(move |service| service.list_permits(&query))
            .await?,
    ))
}

/// Handler for GET `/permits/{permit_id}` endpoint.
async fn handle_get_permit(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
) -> Result<Json<PermitResponse>, HttpError> {
    Ok(Json(
        app_state
            .query(move |service| service.get_permit(permit_id))
            .await?,
    ))
}

/// Handler for GET `/permits/by-number/{permit_number}` endpoint.
async fn handle_get_permit_by_number(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_number): Path<String>,
) -> Result<Json<PermitResponse>, HttpError> {
    Ok(Json(
        app_state
            .query(move |service| service.get_permit_by_number(&permit_number))
            .await?,
    ))
}

/// Handler for PUT `/permits/{permit_id}` endpoint.
async fn handle_update_permit(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<UpdatePermitRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling update_permit request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.update_permit(permit_id, &ctx, &req)
            })
            .await?,
    ))
}

/// Handler for DELETE `/permits/{permit_id}` endpoint. Drafts only.
async fn handle_delete_permit(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
) -> Result<Json<DeletePermitResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling delete_permit request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.delete_permit(permit_id, &ctx))
            .await?,
    ))
}

/// Handler for GET `/permits/{permit_id}/approval-status` endpoint.
async fn handle_get_approval_status(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
) -> Result<Json<ApprovalStatusResponse>, HttpError> {
    Ok(Json(
        app_state
            .query(move |service| service.get_approval_status(permit_id))
            .await?,
    ))
}

// ----------------------------------------------------------------------
// Hazards and precautions
// ----------------------------------------------------------------------

async fn handle_add_hazard(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<HazardRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling add_hazard request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.add_hazard(permit_id, &ctx, &req))
            .await?,
    ))
}

async fn handle_update_hazard(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, hazard_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
    Json(req): Json<HazardRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, hazard_id, actor_id = %ctx.user.id, "Handling update_hazard request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.update_hazard(permit_id, hazard_id, &ctx, &req)
            })
            .await?,
    ))
}

async fn handle_remove_hazard(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, hazard_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, hazard_id, actor_id = %ctx.user.id, "Handling remove_hazard request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.remove_hazard(permit_id, hazard_id, &ctx)
            })
            .await?,
    ))
}

async fn handle_implement_hazard_controls(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, hazard_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
    Json(req): Json<ImplementControlsRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        hazard_id,
        actor_id = %ctx.user.id,
        "Handling implement_hazard_controls request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.implement_hazard_controls(permit_id, hazard_id, &ctx, &req)
            })
            .await?,
    ))
}

async fn handle_add_precaution(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<PrecautionRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling add_precaution request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.add_precaution(permit_id, &ctx, &req)
            })
            .await?,
    ))
}

async fn handle_update_precaution(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, precaution_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
    Json(req): Json<PrecautionRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        precaution_id,
        actor_id = %ctx.user.id,
        "Handling update_precaution request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.update_precaution(permit_id, precaution_id, &ctx, &req)
            })
            .await?,
    ))
}

async fn handle_remove_precaution(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, precaution_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        precaution_id,
        actor_id = %ctx.user.id,
        "Handling remove_precaution request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.remove_precaution(permit_id, precaution_id, &ctx)
            })
            .await?,
    ))
}

/// Handler for POST `/permits/{permit_id}/precautions/{precaution_id}/complete`.
///
/// The body is optional; an empty body records a completion without notes.
async fn handle_complete_precaution(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, precaution_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
    body: Option<Json<CompletePrecautionRequest>>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        precaution_id,
        actor_id = %ctx.user.id,
        "Handling complete_precaution request"
    );
    let req: CompletePrecautionRequest = body.map(|Json(r)| r).unwrap_or_default();
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.complete_precaution(permit_id, precaution_id, &ctx, &req)
            })
            .await?,
    ))
}

async fn handle_verify_precaution(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, precaution_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        precaution_id,
        actor_id = %ctx.user.id,
        "Handling verify_precaution request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.verify_precaution(permit_id, precaution_id, &ctx)
            })
            .await?,
    ))
}

// ----------------------------------------------------------------------
// Attachments
// ----------------------------------------------------------------------

/// Handler for POST `/permits/{permit_id}/attachments` endpoint.
///
/// The request body is the raw file. Its `Content-Type` header is recorded
/// as the attachment's content type.
async fn handle_add_attachment(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Query(query): Query<UploadQuery>,
    Caller(ctx): Caller,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<WriteResponse>), HttpError> {
    info!(
        permit_id,
        actor_id = %ctx.user.id,
        file_name = %query.file_name,
        size = body.len(),
        "Handling add_attachment request"
    );

    let content_type: String = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let req: AddAttachmentRequest = AddAttachmentRequest {
        file_name: query.file_name,
        content_type,
        description: query.description,
        bytes: body.to_vec(),
    };

    let response: WriteResponse = app_state
        .run(ctx.cancellation.clone(), move |service| {
            service.add_attachment(permit_id, &ctx, &req)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET `/permits/{permit_id}/attachments/{attachment_id}` endpoint.
///
/// Returns the stored file with its recorded content type.
async fn handle_get_attachment(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, attachment_id)): Path<(i64, u32)>,
) -> Result<Response, HttpError> {
    let content: AttachmentContent = app_state
        .query(move |service| service.get_attachment(permit_id, attachment_id))
        .await?;

    let disposition: String = format!("attachment; filename=\"{}\"", content.info.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, content.info.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content.bytes,
    )
        .into_response())
}

async fn handle_remove_attachment(
    AxumState(app_state): AxumState<AppState>,
    Path((permit_id, attachment_id)): Path<(i64, u32)>,
    Caller(ctx): Caller,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        attachment_id,
        actor_id = %ctx.user.id,
        "Handling remove_attachment request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.remove_attachment(permit_id, attachment_id, &ctx)
            })
            .await?,
    ))
}

// ----------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------

async fn handle_submit(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling submit request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.submit(permit_id, &ctx))
            .await?,
    ))
}

async fn handle_approve(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        actor_id = %ctx.user.id,
        level = %req.level,
        "Handling approve request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.approve(permit_id, &ctx, &req))
            .await?,
    ))
}

async fn handle_reject(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<RejectRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(
        permit_id,
        actor_id = %ctx.user.id,
        level = %req.level,
        "Handling reject request"
    );
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.reject(permit_id, &ctx, &req))
            .await?,
    ))
}

async fn handle_start_work(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling start_work request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.start_work(permit_id, &ctx))
            .await?,
    ))
}

async fn handle_complete_work(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<CompleteWorkRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling complete_work request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| {
                service.complete_work(permit_id, &ctx, &req)
            })
            .await?,
    ))
}

async fn handle_cancel(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
    Caller(ctx): Caller,
    Json(req): Json<CancelRequest>,
) -> Result<Json<WriteResponse>, HttpError> {
    info!(permit_id, actor_id = %ctx.user.id, "Handling cancel request");
    Ok(Json(
        app_state
            .run(ctx.cancellation.clone(), move |service| service.cancel(permit_id, &ctx, &req))
            .await?,
    ))
}

// ----------------------------------------------------------------------
// Audit
// ----------------------------------------------------------------------

/// Handler for GET `/permits/{permit_id}/audit` endpoint.
async fn handle_get_permit_audit_timeline(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_id): Path<i64>,
) -> Result<Json<AuditTimelineResponse>, HttpError> {
    Ok(Json(
        app_state
            .query(move |service| service.get_permit_audit_timeline(permit_id))
            .await?,
    ))
}

/// Handler for GET `/audit/timeline/{permit_number}` endpoint.
///
/// Also serves the timeline of a deleted permit.
async fn handle_get_audit_timeline(
    AxumState(app_state): AxumState<AppState>,
    Path(permit_number): Path<String>,
) -> Result<Json<AuditTimelineResponse>, HttpError> {
    info!(permit_number = %permit_number, "Handling get_audit_timeline request");
    Ok(Json(
        app_state
            .query(move |service| service.get_audit_timeline(&permit_number))
            .await?,
    ))
}

/// Handler for GET `/audit/event/{event_id}` endpoint.
async fn handle_get_audit_event(
    AxumState(app_state): AxumState<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<AuditEventInfo>, HttpError> {
    info!(event_id, "Handling get_audit_event request");
    Ok(Json(
        app_state
            .query(move |service| service.get_audit_event(event_id))
            .await?,
    ))
}

/// Builds the application router with all endpoints.
fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/permits", post(handle_create_permit).get(handle_list_permits))
        .route(
            "/permits/{permit_id}",
            get(handle_get_permit)
                .put(handle_update_permit)
                .delete(handle_delete_permit),
        )
        .route(
            "/permits/by-number/{permit_number}",
            get(handle_get_permit_by_number),
        )
        .route(
            "/permits/{permit_id}/approval-status",
            get(handle_get_approval_status),
        )
        .route("/permits/{permit_id}/hazards", post(handle_add_hazard))
        .route(
            "/permits/{permit_id}/hazards/{hazard_id}",
            put(handle_update_hazard).delete(handle_remove_hazard),
        )
        .route(
            "/permits/{permit_id}/hazards/{hazard_id}/controls",
            post(handle_implement_hazard_controls),
        )
        .route(
            "/permits/{permit_id}/precautions",
            post(handle_add_precaution),
        )
        .route(
            "/permits/{permit_id}/precautions/{precaution_id}",
            put(handle_update_precaution).delete(handle_remove_precaution),
        )
        .route(
            "/permits/{permit_id}/precautions/{precaution_id}/complete",
            post(handle_complete_precaution),
        )
        .route(
            "/permits/{permit_id}/precautions/{precaution_id}/verify",
            post(handle_verify_precaution),
        )
        .route(
            "/permits/{permit_id}/attachments",
            post(handle_add_attachment).layer(DefaultBodyLimit::max(MAX_ATTACHMENT_BYTES + 1)),
        )
        .route(
            "/permits/{permit_id}/attachments/{attachment_id}",
            get(handle_get_attachment).delete(handle_remove_attachment),
        )
        .route("/permits/{permit_id}/submit", post(handle_submit))
        .route("/permits/{permit_id}/approve", post(handle_approve))
        .route("/permits/{permit_id}/reject", post(handle_reject))
        .route("/permits/{permit_id}/start", post(handle_start_work))
        .route("/permits/{permit_id}/complete", post(handle_complete_work))
        .route("/permits/{permit_id}/cancel", post(handle_cancel))
        .route(
            "/permits/{permit_id}/audit",
            get(handle_get_permit_audit_timeline),
        )
        .route(
            "/audit/timeline/{permit_number}",
            get(handle_get_audit_timeline),
        )
        .route("/audit/event/{event_id}", get(handle_get_audit_event))
        .with_state(app_state)
}

/// Loads the approval policy from a JSON file, or the built-in default.
fn load_approval_policy(
    path: Option<&FsPath>,
) -> Result<ApprovalPolicy, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        info!("Using built-in approval policy");
        return Ok(ApprovalPolicy::default());
    };

    info!(path = %path.display(), "Loading approval policy");
    let contents: String = std::fs::read_to_string(path)?;
    let policy: ApprovalPolicy = serde_json::from_str(&contents)?;
    policy.validate()?;
    Ok(policy)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Args = Args::parse();

    // Initialize tracing
    let filter: tracing_subscriber::EnvFilter = match &args.log_filter {
        Some(directives) => tracing_subscriber::EnvFilter::try_new(directives)?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Initializing HSE Permit Server");

    // Initialize persistence (in-memory or file-based based on CLI argument)
    let mut persistence: Persistence = if let Some(db_path) = &args.database {
        info!("Using file-based database at: {db_path}");
        Persistence::new_with_file(db_path)?
    } else {
        warn!("Using in-memory database; permits will not survive a restart");
        Persistence::new_in_memory()?
    };
    persistence.verify_foreign_key_enforcement()?;

    let policy: ApprovalPolicy = load_approval_policy(args.approval_policy.as_deref())?;

    std::fs::create_dir_all(&args.attachments_dir)?;
    info!(
        attachments_dir = %args.attachments_dir.display(),
        "Storing attachments on disk"
    );
    let attachments: FsAttachmentStore = FsAttachmentStore::new(args.attachments_dir.clone());

    let service: PermitService = PermitService::new(persistence, policy, Box::new(attachments))?;
    let request_timeout: Duration = Duration::from_secs(args.request_timeout_secs);
    let app: Router = build_router(AppState::new(service, request_timeout));

    // Bind to address
    let addr: std::net::SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    info!("Server listening on {addr}");

    // Run server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::identity::{
        REQUEST_ID_HEADER, USER_DEPARTMENT_HEADER, USER_ID_HEADER, USER_NAME_HEADER,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode as HttpStatusCode},
    };
    use hse_permit_api::{CurrentUser, RequestContext, generate_storage_key};
    use hse_permit_audit::Cause;
    use hse_permit_domain::PermitStatus;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    /// Helper to create test app state with in-memory persistence.
    fn create_test_state(request_timeout: Duration) -> (AppState, PathBuf) {
        let root: PathBuf = std::env::temp_dir().join(format!(
            "hse-permit-server-{}",
            generate_storage_key()
        ));
        let persistence: Persistence =
            Persistence::new_in_memory().expect("Failed to create in-memory persistence");
        let service: PermitService = PermitService::new(
            persistence,
            ApprovalPolicy::default(),
            Box::new(FsAttachmentStore::new(root.clone())),
        )
        .unwrap();
        (AppState::new(service, request_timeout), root)
    }

    fn create_test_app() -> (Router, PathBuf) {
        let (state, root) = create_test_state(Duration::from_secs(30));
        (build_router(state), root)
    }

    fn test_context() -> RequestContext {
        RequestContext::new(
            CurrentUser::new("u-100", "Dewi Lestari", "Maintenance").unwrap(),
            Cause::new(String::from("test-request"), String::from("test")),
        )
    }

    fn request(method: &str, uri: &str, user: Option<&str>) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match user {
            Some(id) => builder
                .header(USER_ID_HEADER, id)
                .header(USER_NAME_HEADER, format!("User {id}"))
                .header(USER_DEPARTMENT_HEADER, "Maintenance")
                .header(REQUEST_ID_HEADER, "test-request"),
            None => builder,
        }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (HttpStatusCode, Value) {
        let builder = request(method, uri, user);
        let req: Request<Body> = match body {
            Some(json_body) => builder
                .header("content-type", "application/json")
                .body(Body::from(json_body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(req).await.unwrap();
        let status: HttpStatusCode = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn create_body(permit_type: &str) -> Value {
        json!({
            "title": "Replace pump seal",
            "description": "Replace leaking seal on cooling water pump P-101",
            "permit_type": permit_type,
            "location": "Utility area, Plant 2",
            "planned_start": "2026-03-03T07:00:00Z",
            "planned_end": "2026-03-03T17:00:00Z",
            "number_of_workers": 3
        })
    }

    fn hazard_body() -> Value {
        json!({
            "description": "Pressurised line",
            "category": "Mechanical",
            "likelihood": 3,
            "severity": 4,
            "control_measures": "Depressurise and lock out"
        })
    }

    async fn create_submitted(app: &Router) -> i64 {
        let (status, created) =
            send(app, "POST", "/permits", Some("u-100"), Some(create_body("General"))).await;
        assert_eq!(status, HttpStatusCode::CREATED);
        let id: i64 = created["permit_id"].as_i64().unwrap();

        let (status, _) = send(
            app,
            "POST",
            &format!("/permits/{id}/hazards"),
            Some("u-100"),
            Some(hazard_body()),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);

        let (status, submitted) =
            send(app, "POST", &format!("/permits/{id}/submit"), Some("u-100"), None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(submitted["status"], "Submitted");
        id
    }

    #[tokio::test]
    async fn test_write_without_identity_is_unauthorized() {
        let (app, _) = create_test_app();

        let (status, body) =
            send(&app, "POST", "/permits", None, Some(create_body("General"))).await;

        assert_eq!(status, HttpStatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "authentication_failed");
    }

    #[tokio::test]
    async fn test_submit_and_approve_over_http() {
        let (app, _) = create_test_app();
        let id: i64 = create_submitted(&app).await;

        let (status, approved) = send(
            &app,
            "POST",
            &format!("/permits/{id}/approve"),
            Some("supervisor-1"),
            Some(json!({ "level": "Supervisor", "comments": "Checked on site" })),
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(approved["status"], "Approved");

        let (status, progress) = send(
            &app,
            "GET",
            &format!("/permits/{id}/approval-status"),
            None,
            None,
        )
        .await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(progress["progress_percent"], 100);
        assert_eq!(progress["is_fully_approved"], true);

        let (_, permit) = send(&app, "GET", &format!("/permits/{id}"), None, None).await;
        assert_eq!(permit["overall_risk_level"], "Medium");
        assert_eq!(permit["approvals"][0]["approver_id"], "supervisor-1");
    }

    #[tokio::test]
    async fn test_errors_map_to_status_codes() {
        let (app, _) = create_test_app();

        let (status, _) = send(&app, "GET", "/permits/999", None, None).await;
        assert_eq!(status, HttpStatusCode::NOT_FOUND);

        let (status, body) =
            send(&app, "POST", "/permits", Some("u-100"), Some(create_body("Welding"))).await;
        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "permit_type");

        let id: i64 = create_submitted(&app).await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/permits/{id}/hazards"),
            Some("u-100"),
            Some(hazard_body()),
        )
        .await;
        assert_eq!(status, HttpStatusCode::CONFLICT);
        assert_eq!(body["kind"], "invalid_transition");
    }

    #[tokio::test]
    async fn test_list_filters_by_status() {
        let (app, _) = create_test_app();
        create_submitted(&app).await;
        send(&app, "POST", "/permits", Some("u-200"), Some(create_body("ColdWork"))).await;

        let (status, listed) = send(&app, "GET", "/permits?status=Submitted", None, None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(listed["permits"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "GET", "/permits?limit=0", None, None).await;
        assert_eq!(status, HttpStatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_attachment_upload_and_download() {
        let (app, root) = create_test_app();
        let (_, created) =
            send(&app, "POST", "/permits", Some("u-100"), Some(create_body("General"))).await;
        let id: i64 = created["permit_id"].as_i64().unwrap();

        let upload: Request<Body> = request(
            "POST",
            &format!("/permits/{id}/attachments?file_name=loto.txt"),
            Some("u-100"),
        )
        .header("content-type", "text/plain")
        .body(Body::from("isolation points: V-12, V-14"))
        .unwrap();
        let response = app.clone().oneshot(upload).await.unwrap();
        assert_eq!(response.status(), HttpStatusCode::CREATED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let written: WriteResponse = serde_json::from_slice(&bytes).unwrap();
        let attachment_id: u32 = written.child_id.unwrap();

        let download: Request<Body> = request(
            "GET",
            &format!("/permits/{id}/attachments/{attachment_id}"),
            None,
        )
        .body(Body::empty())
        .unwrap();
        let response = app.clone().oneshot(download).await.unwrap();
        assert_eq!(response.status(), HttpStatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"loto.txt\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"isolation points: V-12, V-14");

        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_header_breaking_file_names_are_refused() {
        let (app, root) = create_test_app();
        let (_, created) =
            send(&app, "POST", "/permits", Some("u-100"), Some(create_body("General"))).await;
        let id: i64 = created["permit_id"].as_i64().unwrap();

        for encoded in ["report%22.pdf", "report.pdf%0D%0ASet-Cookie:%20x=1"] {
            let upload: Request<Body> = request(
                "POST",
                &format!("/permits/{id}/attachments?file_name={encoded}"),
                Some("u-100"),
            )
            .header("content-type", "application/pdf")
            .body(Body::from("%PDF-1.7"))
            .unwrap();
            let response = app.clone().oneshot(upload).await.unwrap();
            assert_eq!(response.status(), HttpStatusCode::UNPROCESSABLE_ENTITY);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body["field"], "file_name");
        }

        let (_, permit) = send(&app, "GET", &format!("/permits/{id}"), None, None).await;
        assert!(permit["attachments"].as_array().unwrap().is_empty());

        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_deleted_permit_keeps_audit_timeline() {
        let (app, _) = create_test_app();
        let (_, created) =
            send(&app, "POST", "/permits", Some("u-100"), Some(create_body("General"))).await;
        let id: i64 = created["permit_id"].as_i64().unwrap();
        let number: String = created["permit_number"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "DELETE", &format!("/permits/{id}"), Some("u-100"), None).await;
        assert_eq!(status, HttpStatusCode::OK);

        let (status, timeline) =
            send(&app, "GET", &format!("/audit/timeline/{number}"), None, None).await;
        assert_eq!(status, HttpStatusCode::OK);
        let events = timeline["events"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["action"], "DeletePermit");
        assert_eq!(events[1]["cause_id"], "test-request");

        let event_id: i64 = events[0]["event_id"].as_i64().unwrap();
        let (status, event) =
            send(&app, "GET", &format!("/audit/event/{event_id}"), None, None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(event["action"], "CreatePermit");
    }

    #[tokio::test]
    async fn test_timed_out_command_is_cancelled_before_commit() {
        let (state, root) = create_test_state(Duration::from_secs(30));
        let app: Router = build_router(state.clone());
        let (_, created) =
            send(&app, "POST", "/permits", Some("u-100"), Some(create_body("General"))).await;
        let id: i64 = created["permit_id"].as_i64().unwrap();

        let impatient: AppState = AppState {
            service: Arc::clone(&state.service),
            request_timeout: Duration::from_millis(20),
        };
        let ctx: RequestContext = test_context();
        let result: Result<WriteResponse, HttpError> = impatient
            .run(ctx.cancellation.clone(), move |service| {
                std::thread::sleep(Duration::from_millis(200));
                service.cancel(
                    id,
                    &ctx,
                    &CancelRequest {
                        reason: String::from("Shutdown rescheduled"),
                    },
                )
            })
            .await;
        let Err(err) = result else {
            panic!("command should have been cancelled");
        };
        assert_eq!(err.status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.body.kind, "cancelled");

        let (status, permit) = send(&app, "GET", &format!("/permits/{id}"), None, None).await;
        assert_eq!(status, HttpStatusCode::OK);
        assert_eq!(permit["status"], PermitStatus::Draft.as_str());
        assert_eq!(permit["version"], 1);

        std::fs::remove_dir_all(root).ok();
    }

    #[tokio::test]
    async fn test_abandoned_request_trips_its_cancellation_signal() {
        let (state, _) = create_test_state(Duration::from_secs(30));
        let signal: CancellationSignal = CancellationSignal::new();

        let pending = state.run(signal.clone(), |_service| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        });
        assert!(
            tokio::time::timeout(Duration::from_millis(20), pending)
                .await
                .is_err()
        );
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_completed_request_leaves_signal_untouched() {
        let (state, _) = create_test_state(Duration::from_secs(30));
        let signal: CancellationSignal = CancellationSignal::new();
        let value: u32 = state.run(signal.clone(), |_service| Ok(7)).await.ok().unwrap();
        assert_eq!(value, 7);
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_default_policy_is_used_without_a_file() {
        let policy: ApprovalPolicy = load_approval_policy(None).unwrap();
        assert_eq!(policy, ApprovalPolicy::default());
    }

    #[test]
    fn test_policy_file_with_padded_label_is_refused() {
        let path: PathBuf = std::env::temp_dir().join(format!(
            "hse-permit-policy-{}.json",
            generate_storage_key()
        ));
        std::fs::write(&path, r#"{ "base_levels": [" Supervisor"] }"#).unwrap();
        let err = load_approval_policy(Some(path.as_path())).unwrap_err();
        assert!(err.to_string().contains("surrounding whitespace"), "{err}");

        std::fs::write(&path, r#"{ "base_levels": ["Supervisor"] }"#).unwrap();
        let policy: ApprovalPolicy = load_approval_policy(Some(path.as_path())).unwrap();
        assert_eq!(policy.base_levels, vec![String::from("Supervisor")]);

        std::fs::remove_file(path).ok();
    }
}
