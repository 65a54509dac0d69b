use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tasking_engine::{loader, run_scenario, RunReport, TaskingError};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SimulateRequest {
    /// Same shape as the scenario file
    pub scenario: serde_json::Value,
    /// Same shape as the targets file
    #[serde(default = "empty_targets")]
    pub targets: serde_json::Value,
}

fn empty_targets() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

#[derive(Serialize)]
pub struct SimulateResponse {
    pub run_id: Uuid,
    pub status: &'static str,
    pub report: RunReport,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(code: StatusCode, error: impl ToString) -> ApiError {
    (
        code,
        Json(ErrorResponse {
            status: "error",
            error: error.to_string(),
        }),
    )
}

fn status_for(err: &TaskingError) -> StatusCode {
    if err.is_configuration() {
        StatusCode::BAD_REQUEST
    } else {
        match err {
            TaskingError::Geometry(_) | TaskingError::UnknownSatellite(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "orbital-tasking-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn simulate(
    Json(request): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let run_id = Uuid::new_v4();

    let outcome = tokio::task::spawn_blocking(move || -> tasking_engine::Result<RunReport> {
        let targets = loader::parse_targets(request.targets)?;
        let scenario = loader::parse_scenario(request.scenario, targets)?;
        run_scenario(scenario)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let report = outcome.map_err(|e| {
        let code = status_for(&e);
        warn!(%run_id, status = code.as_u16(), error = %e, "simulation rejected");
        api_error(code, e)
    })?;

    info!(
        %run_id,
        ticks = report.summary.ticks,
        rows = report.summary.rows,
        "simulation complete"
    );

    Ok(Json(SimulateResponse {
        run_id,
        status: "ok",
        report,
    }))
}
