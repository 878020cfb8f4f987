use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use chrono::Utc;
use registry_common::ResourceKind;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::AppState;
use crate::domain::error::{ResearchError, ValidationError};
use crate::domain::filter::FilterParams;
use crate::domain::stats::PublicationStats;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::auth::CurrentCaller;
use crate::infrastructure::http::handlers::research::dto::{
    CountResponse, DeleteManyRequest, ManyRecordsResponse, MessageResponse, OneRecordResponse,
};
use crate::infrastructure::http::querystring::FilterQuery;

mod dto;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Routes of every research kind, each under `/research/{kind}`
pub fn research_routes<S: AppState>() -> Router<S> {
    ResourceKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| router.merge(kind_routes(kind)))
}

// static segments win over `{id}`, so export and stats never reach find_record
fn kind_routes<S: AppState>(kind: ResourceKind) -> Router<S> {
    let base = format!("/research/{}", kind.path_segment());
    Router::new()
        .route(
            &base,
            get(list_records::<S>)
                .post(create_record::<S>)
                .delete(delete_records::<S>),
        )
        .route(&format!("{base}/export"), get(export_records::<S>))
        .route(&format!("{base}/stats"), get(record_stats::<S>))
        .route(
            &format!("{base}/{{id}}"),
            get(find_record::<S>)
                .patch(update_record::<S>)
                .delete(delete_record::<S>),
        )
        .layer(Extension(kind))
}

pub async fn list_records<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    query: FilterQuery,
) -> Result<ApiSuccess<ManyRecordsResponse>, ApiError> {
    let params = FilterParams::from(query);
    let (page, request) = state
        .research()
        .list(kind, caller.caller(), &params)
        .await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        ManyRecordsResponse::new(kind, page, &request),
    ))
}

pub async fn find_record<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    Path(id): Path<String>,
) -> Result<ApiSuccess<OneRecordResponse>, ApiError> {
    state
        .research()
        .get(kind, caller.caller(), &id)
        .await
        .map_err(ApiError::from)
        .map(|record| ApiSuccess::new(StatusCode::OK, OneRecordResponse::new(record)))
}

pub async fn create_record<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    body: Bytes,
) -> Result<ApiSuccess<OneRecordResponse>, ApiError> {
    let caller = caller.required()?;
    let payload: Value = parse_body(&body)?;
    state
        .research()
        .create(kind, &caller, &payload)
        .await
        .map_err(ApiError::from)
        .map(|record| ApiSuccess::new(StatusCode::CREATED, OneRecordResponse::new(record)))
}

pub async fn update_record<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiSuccess<OneRecordResponse>, ApiError> {
    let caller = caller.required()?;
    let payload: Value = parse_body(&body)?;
    state
        .research()
        .update(kind, &caller, &id, &payload)
        .await
        .map_err(ApiError::from)
        .map(|record| ApiSuccess::new(StatusCode::OK, OneRecordResponse::new(record)))
}

pub async fn delete_record<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    Path(id): Path<String>,
) -> Result<ApiSuccess<MessageResponse>, ApiError> {
    let caller = caller.required()?;
    state.research().delete(kind, &caller, &id).await?;
    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageResponse {
            message: format!("{} deleted successfully", kind.display_name()),
        },
    ))
}

pub async fn delete_records<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    body: Bytes,
) -> Result<ApiSuccess<CountResponse>, ApiError> {
    let caller = caller.required()?;
    let request: DeleteManyRequest = parse_body(&body)?;
    let count = state
        .research()
        .delete_many(kind, &caller, &request.ids)
        .await?;
    Ok(ApiSuccess::new(StatusCode::OK, CountResponse { count }))
}

pub async fn export_records<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    query: FilterQuery,
) -> Result<Response, ApiError> {
    let caller = caller.required()?;
    let params = FilterParams::from(query);
    let csv = state.research().export(kind, &caller, &params).await?;

    let file_name = format!(
        "{}-{}.csv",
        kind.export_file_prefix(),
        Utc::now().format("%Y-%m-%dT%H-%M-%S")
    );
    let headers = [
        (CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ];
    Ok((headers, csv).into_response())
}

pub async fn record_stats<S: AppState>(
    State(state): State<S>,
    Extension(kind): Extension<ResourceKind>,
    caller: CurrentCaller,
    query: FilterQuery,
) -> Result<ApiSuccess<PublicationStats>, ApiError> {
    let params = FilterParams::from(query);
    state
        .research()
        .stats(kind, caller.caller(), &params)
        .await
        .map_err(ApiError::from)
        .map(|stats| ApiSuccess::new(StatusCode::OK, stats))
}

/// Request bodies that are not the expected JSON shape are a plain 400
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!("rejected request body: {}", e);
        ResearchError::from(ValidationError::InvalidBody).into()
    })
}
