use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use ctscan_discovery::{CityProcess, CoordinatorError};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_coordinator_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// A city snapshot plus the derived fields a dashboard renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CityItem {
    #[serde(flatten)]
    process: CityProcess,
    status_text: String,
    progress: f64,
}

impl From<CityProcess> for CityItem {
    fn from(process: CityProcess) -> Self {
        Self {
            status_text: process.status_text(),
            progress: process.progress(),
            process,
        }
    }
}

type CityResponse = Result<(StatusCode, Json<ApiResponse<CityItem>>), ApiError>;

fn respond(
    req_id: RequestId,
    status: StatusCode,
    result: Result<CityProcess, CoordinatorError>,
) -> CityResponse {
    match result {
        Ok(process) => Ok((
            status,
            Json(ApiResponse {
                data: CityItem::from(process),
                meta: ResponseMeta::new(req_id.0),
            }),
        )),
        Err(e) => Err(map_coordinator_error(req_id.0, &e)),
    }
}

/// Replace the city list with the CSV in the request body.
pub(super) async fn load_cities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: String,
) -> Result<Json<ApiResponse<Vec<CityItem>>>, ApiError> {
    let cities = ctscan_core::parse_cities_csv(&body).map_err(|e| {
        tracing::info!(error = %e, "rejected city upload");
        ApiError::new(req_id.0.clone(), "validation_error", e.to_string())
    })?;

    state.coordinator.load(&cities);
    let data = state
        .coordinator
        .list()
        .into_iter()
        .map(CityItem::from)
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn list_cities(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<CityItem>>> {
    let data = state
        .coordinator
        .list()
        .into_iter()
        .map(CityItem::from)
        .collect();
    Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    })
}

pub(super) async fn get_city(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> CityResponse {
    let result = state
        .coordinator
        .get(&id)
        .ok_or(CoordinatorError::UnknownCity(id));
    respond(req_id, StatusCode::OK, result)
}

pub(super) async fn start_city(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> CityResponse {
    respond(req_id, StatusCode::ACCEPTED, state.coordinator.start(&id))
}

pub(super) async fn confirm_city(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> CityResponse {
    respond(req_id, StatusCode::ACCEPTED, state.coordinator.confirm(&id))
}

pub(super) async fn stop_city(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> CityResponse {
    respond(req_id, StatusCode::OK, state.coordinator.stop(&id))
}

pub(super) async fn reject_city(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> CityResponse {
    respond(req_id, StatusCode::OK, state.coordinator.reject(&id))
}

pub(super) async fn reset_city(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> CityResponse {
    respond(req_id, StatusCode::OK, state.coordinator.reset(&id))
}
