use crate::availability::{check_availability, validate_settings, AvailabilityReason, AvailableSlot};
use crate::backend::Backend;
use crate::call_scheduler::{schedule_call, ScheduleCallRequest, CONTACT_PAGE};
use crate::configuration::Configuration;
use crate::error::{BackendError, GitHubError, ScheduleError};
use crate::github::GitHubClient;
use crate::release_notes::{parse_release_notes, ReleaseNotes};
use crate::release_sync::sync_releases;
use crate::revalidate::Revalidator;
use crate::types::{AvailabilitySettings, Release, ScheduledCall};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request};
use axum::http::{header, HeaderMap};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum::{
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, fmt::Debug};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

const RELEASE_LIST_LIMIT: usize = 200;
const RELEASES_CACHE_CONTROL: &str = "public, s-maxage=300, stale-while-revalidate=600";
const AVAILABILITY_FAILED: &str = "Failed to check availability. Please try again later.";
const SCHEDULING_FAILED: &str = "Failed to schedule call. Please try again later.";
const SYNC_FAILED: &str = "Failed to sync releases";

#[derive(Clone)]
pub struct AppState<B: Backend> {
    pub backend: B,
    pub github: GitHubClient,
    pub revalidator: Revalidator,
    admin_password: String,
    sync_token: Option<String>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    Unauthorized(&'static str),
    NotFound(String),
    Conflict(String),
    Unprocessable(String),
    Unavailable(&'static str),
    Internal(String),
}

impl ApiError {
    fn internal(context: &str, err: impl Debug) -> Self {
        error!(?err, "{context}");
        ApiError::Internal(context.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ActionResponse::<()>::failure(message))).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AvailabilityQuery {
    date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    available_slots: Vec<AvailableSlot>,
    booked_slots: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<AvailabilityReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AvailabilityResponse {
    fn failure(error: String) -> Self {
        Self {
            success: false,
            date: None,
            available_slots: vec![],
            booked_slots: vec![],
            message: None,
            reason: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ActionResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ActionResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failure(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct SyncResponse {
    success: bool,
    message: String,
    created: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ReleaseDetails {
    release: Release,
    notes: ReleaseNotes,
}

pub fn create_app<B: Backend, C: Configuration>(
    backend: B,
    configuration: C,
) -> Result<Router, GitHubError> {
    let github = GitHubClient::new(
        &configuration.github_api_url(),
        &configuration.github_repository(),
        configuration.github_token().as_deref(),
    )?;
    if configuration.sync_token().is_none() {
        warn!("No release sync token configured, POST /api/releases is disabled");
    }

    let state = AppState {
        backend,
        github,
        revalidator: Revalidator::default(),
        admin_password: configuration.admin_password(),
        sync_token: configuration.sync_token(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/availability", get(get_availability::<B>))
        .route("/api/schedule-call", post(post_schedule_call::<B>))
        .route(
            "/api/releases",
            get(list_releases::<B>).post(post_sync_releases::<B>),
        )
        .route("/api/releases/:version", get(get_release::<B>))
        .route("/api/revalidations", get(stream_revalidations::<B>));

    let admin = Router::new()
        .route(
            "/api/admin/availability",
            get(get_settings::<B>).put(put_settings::<B>),
        )
        .route("/api/admin/calls", get(list_calls::<B>))
        .route("/api/admin/calls/:id/cancel", post(cancel_call::<B>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<B>,
        ));

    Ok(Router::new()
        .merge(public)
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

async fn admin_auth<B: Backend>(
    State(state): State<AppState<B>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match request.headers().get("x-admin-password") {
        Some(password) if password.to_str().unwrap_or("") == state.admin_password => {
            Ok(next.run(request).await)
        }
        Some(_) => Err(ApiError::Unauthorized("Unauthorized")),
        None => Err(ApiError::Unauthorized("Missing credentials")),
    }
}

fn authorize_sync<B: Backend>(state: &AppState<B>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.sync_token.as_deref() else {
        return Err(ApiError::Unavailable("Release sync is not configured"));
    };
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized("Missing credentials"))?;
    if provided != expected {
        return Err(ApiError::Unauthorized("Unauthorized"));
    }
    Ok(())
}

async fn health() -> &'static str {
    "OK"
}

async fn get_availability<B: Backend>(
    State(state): State<AppState<B>>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> impl IntoResponse {
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AvailabilityResponse::failure(rejection.body_text())),
            )
        }
    };

    match check_availability(&state.backend, query.date, Utc::now()) {
        Ok(availability) => (
            StatusCode::OK,
            Json(AvailabilityResponse {
                success: true,
                date: Some(availability.date),
                available_slots: availability.available_slots,
                booked_slots: availability.booked_slots,
                message: availability.message,
                reason: Some(availability.reason),
                error: None,
            }),
        ),
        Err(err) if err.is_validation() => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(AvailabilityResponse::failure(err.to_string())),
        ),
        Err(err) => {
            error!(?err, "Availability check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AvailabilityResponse::failure(AVAILABILITY_FAILED.into())),
            )
        }
    }
}

async fn post_schedule_call<B: Backend>(
    State(state): State<AppState<B>>,
    request: Result<Json<ScheduleCallRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionResponse<ScheduledCall>>), ApiError> {
    let Json(request) = request?;
    request
        .validate()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    match schedule_call(&state.backend, &state.revalidator, request, Utc::now()) {
        Ok(call) => Ok((StatusCode::CREATED, Json(ActionResponse::ok(call)))),
        Err(err @ ScheduleError::SlotFullyBooked) => Err(ApiError::Conflict(err.to_string())),
        Err(err @ ScheduleError::UnknownSlot(_)) => Err(ApiError::Unprocessable(err.to_string())),
        Err(ScheduleError::Availability(err)) if err.is_validation() => {
            Err(ApiError::Unprocessable(err.to_string()))
        }
        Err(err) => Err(ApiError::internal(SCHEDULING_FAILED, err)),
    }
}

async fn list_releases<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<impl IntoResponse, ApiError> {
    let releases = state
        .backend
        .releases(RELEASE_LIST_LIMIT)
        .map_err(|err| ApiError::internal("Failed to fetch releases", err))?;
    Ok((
        [(header::CACHE_CONTROL, RELEASES_CACHE_CONTROL)],
        Json(releases),
    ))
}

async fn get_release<B: Backend>(
    State(state): State<AppState<B>>,
    Path(version): Path<String>,
) -> Result<Json<ReleaseDetails>, ApiError> {
    let release = state
        .backend
        .release(&version)
        .map_err(|err| ApiError::internal("Failed to fetch release", err))?
        .ok_or_else(|| ApiError::NotFound(format!("Release {version} not found")))?;
    let notes = parse_release_notes(&release.content);
    Ok(Json(ReleaseDetails { release, notes }))
}

async fn post_sync_releases<B: Backend>(
    State(state): State<AppState<B>>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, ApiError> {
    authorize_sync(&state, &headers)?;

    let summary = sync_releases(&state.github, &state.backend, &state.revalidator, Utc::now())
        .await
        .map_err(|err| ApiError::internal(SYNC_FAILED, err))?;
    info!(created = summary.created, "Releases synced");

    Ok(Json(SyncResponse {
        success: true,
        message: format!(
            "Synced releases: {} created, {} already stored, {} skipped",
            summary.created, summary.skipped_existing, summary.failed
        ),
        created: summary.created,
    }))
}

async fn stream_revalidations<B: Backend>(
    State(state): State<AppState<B>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = state
        .revalidator
        .subscribe()
        .filter_map(|revalidation| async move {
            let revalidation = revalidation
                .map_err(|err| warn!(?err, "Revalidation subscriber lagged"))
                .ok()?;
            let data = serde_json::to_string(&revalidation).ok()?;
            Some(Ok::<_, Infallible>(
                Event::default().event("revalidate").data(data),
            ))
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn get_settings<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<AvailabilitySettings>, ApiError> {
    state
        .backend
        .availability_settings()
        .map_err(|err| ApiError::internal("Failed to load availability settings", err))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Availability settings are not configured".into()))
}

async fn put_settings<B: Backend>(
    State(state): State<AppState<B>>,
    settings: Result<Json<AvailabilitySettings>, JsonRejection>,
) -> Result<Json<AvailabilitySettings>, ApiError> {
    let Json(settings) = settings?;
    validate_settings(&settings).map_err(|err| ApiError::BadRequest(err.to_string()))?;
    state
        .backend
        .save_availability_settings(settings.clone())
        .map_err(|err| ApiError::internal("Failed to save availability settings", err))?;
    state.revalidator.revalidate_path(CONTACT_PAGE);
    Ok(Json(settings))
}

async fn list_calls<B: Backend>(
    State(state): State<AppState<B>>,
) -> Result<Json<Vec<ScheduledCall>>, ApiError> {
    state
        .backend
        .scheduled_calls()
        .map(Json)
        .map_err(|err| ApiError::internal("Failed to load scheduled calls", err))
}

async fn cancel_call<B: Backend>(
    State(state): State<AppState<B>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ScheduledCall>, ApiError> {
    let Path(id) = id?;
    match state.backend.cancel_call(id) {
        Ok(call) => {
            info!(call_id = %id, "Cancelled call");
            state.revalidator.revalidate_path(CONTACT_PAGE);
            Ok(Json(call))
        }
        Err(err @ BackendError::CallNotFound(_)) => Err(ApiError::NotFound(err.to_string())),
        Err(err) => Err(ApiError::internal("Failed to cancel call", err)),
    }
}
