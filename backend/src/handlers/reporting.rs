//! Reporting handlers for the organizer views and data export

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::reporting::{FarmerStatisticsCsvRow, ReportFilter, ReportingService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    fn filter(&self) -> ReportFilter {
        ReportFilter {
            from: self.from,
            to: self.to,
        }
    }

    fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

#[derive(Debug, Deserialize)]
pub struct RawInventoryQuery {
    pub station_id: Option<Uuid>,
    pub format: Option<String>,
}

/// Write rows as a CSV attachment
fn csv_response<T: Serialize>(rows: &[T], filename: &str) -> AppResult<Response> {
    let csv = ReportingService::export_to_csv(rows)?;
    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Raw stock at the packing stations
pub async fn get_raw_inventory(
    State(state): State<AppState>,
    Query(query): Query<RawInventoryQuery>,
) -> AppResult<Response> {
    let report = ReportingService::new(state.db).raw_inventory(query.station_id).await?;

    if query.format.as_deref() == Some("csv") {
        csv_response(&report.varieties, "raw_inventory.csv")
    } else {
        Ok(Json(report).into_response())
    }
}

/// Weekly intake per cooking type
pub async fn get_weekly_summary(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let rows = ReportingService::new(state.db).weekly_summary(query.filter()).await?;

    if query.wants_csv() {
        csv_response(&rows, "weekly_summary.csv")
    } else {
        Ok(Json(rows).into_response())
    }
}

/// Delivery plans against actual deliveries
pub async fn get_plan_comparison(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let rows = ReportingService::new(state.db).plan_comparison(query.filter()).await?;

    if query.wants_csv() {
        csv_response(&rows, "plan_comparison.csv")
    } else {
        Ok(Json(rows).into_response())
    }
}

/// Per-farmer statistics
pub async fn get_farmer_statistics(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let stats = ReportingService::new(state.db).farmer_statistics(query.filter()).await?;

    if query.wants_csv() {
        let rows: Vec<FarmerStatisticsCsvRow> = stats.iter().map(FarmerStatisticsCsvRow::from).collect();
        csv_response(&rows, "farmer_statistics.csv")
    } else {
        Ok(Json(stats).into_response())
    }
}

/// Packaging yield per run
pub async fn get_packaging_efficiency(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let report = ReportingService::new(state.db).packaging_efficiency(query.filter()).await?;

    if query.wants_csv() {
        csv_response(&report.runs, "packaging_efficiency.csv")
    } else {
        Ok(Json(report).into_response())
    }
}

/// Profit and loss over a period
pub async fn get_profit_and_loss(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let currency = state.config.reporting.currency.clone();
    let statement = ReportingService::new(state.db)
        .profit_and_loss(query.filter(), &currency)
        .await?;

    if query.wants_csv() {
        csv_response(std::slice::from_ref(&statement), "profit_and_loss.csv")
    } else {
        Ok(Json(statement).into_response())
    }
}
