//! Chart HTTP route handlers
//!
//! - `GET /charts/:period` - top shared tracks for `daily`, `weekly`,
//!   `monthly` or `yearly`

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::models::ChartEntry;
use crate::services::ChartService;
use dailyjam_worker::scheduler::Clock;
use dailyjam_worker::window::ChartPeriod;

/// State for chart handlers
#[derive(Clone)]
pub struct ChartState {
    pub chart_service: ChartService,
    pub clock: Arc<dyn Clock>,
}

/// Create chart router
pub fn charts_router(state: ChartState) -> Router {
    Router::new()
        .route("/charts/:period", get(get_chart))
        .with_state(state)
}

async fn get_chart(
    State(state): State<ChartState>,
    Path(period): Path<String>,
) -> ApiResult<Json<Vec<ChartEntry>>> {
    let period = parse_period(&period)?;
    let entries = state.chart_service.chart(period, state.clock.now()).await?;
    Ok(Json(entries))
}

fn parse_period(raw: &str) -> ApiResult<ChartPeriod> {
    raw.parse()
        .map_err(|reason| ApiError::InvalidQueryParam {
            name: "period",
            reason,
        })
}
