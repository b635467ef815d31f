//! Reporting service for the organizer views and CSV exports

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{
    aggregate_weekly, calculate_packaging_yield, compare_plan, farmer_statistics, packed_weight_kg,
    raw_inventory, validate_iso_week, widen_to_iso_weeks, CookingType, DateRange, DatedQuantity,
    FarmerDeliveryLine, FarmerStatistics, IsoWeek, MovementReason, PackagingYield,
    PlanComparisonRow, PlannedQuantity, ProfitAndLoss, ProfitAndLossInputs, RawInventoryReport,
    VarietyQuantity, WeeklyCookingTypeTotal,
};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Optional date range shared by most reports
#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub struct ReportFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportFilter {
    fn check(&self) -> AppResult<()> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if DateRange::new(from, to).is_none() {
                return Err(AppError::invalid("from", "Start date must not be after end date"));
            }
        }
        Ok(())
    }
}

/// One packaging run in the efficiency report
#[derive(Debug, Clone, Serialize)]
pub struct PackagingEfficiencyRow {
    pub run_id: Uuid,
    pub run_date: NaiveDate,
    pub product_name: String,
    pub colli_packed: i32,
    pub raw_input_kg: Decimal,
    pub packed_weight_kg: Decimal,
    pub sorting_waste_kg: Decimal,
    pub yield_percent: Decimal,
    pub loss_percent: Decimal,
}

/// Packaging efficiency over a period
#[derive(Debug, Clone, Serialize)]
pub struct PackagingEfficiencyReport {
    pub runs: Vec<PackagingEfficiencyRow>,
    pub totals: PackagingYield,
}

/// Flat farmer statistics line for CSV export
#[derive(Debug, Clone, Serialize)]
pub struct FarmerStatisticsCsvRow {
    pub farmer_id: Uuid,
    pub farmer_name: String,
    pub delivery_count: usize,
    pub delivered_kg: Decimal,
    pub payout: Decimal,
    pub current_stock_kg: Decimal,
    pub waxy_kg: Decimal,
    pub mostly_waxy_kg: Decimal,
    pub floury_kg: Decimal,
}

impl From<&FarmerStatistics> for FarmerStatisticsCsvRow {
    fn from(stats: &FarmerStatistics) -> Self {
        let of_type = |cooking_type: CookingType| {
            stats
                .by_cooking_type
                .iter()
                .find(|t| t.cooking_type == cooking_type)
                .map(|t| t.quantity_kg)
                .unwrap_or(Decimal::ZERO)
        };
        FarmerStatisticsCsvRow {
            farmer_id: stats.farmer_id,
            farmer_name: stats.farmer_name.clone(),
            delivery_count: stats.delivery_count,
            delivered_kg: stats.delivered_kg,
            payout: stats.payout,
            current_stock_kg: stats.current_stock_kg,
            waxy_kg: of_type(CookingType::Waxy),
            mostly_waxy_kg: of_type(CookingType::MostlyWaxy),
            floury_kg: of_type(CookingType::Floury),
        }
    }
}

#[derive(Debug, FromRow)]
struct VarietyQuantityRow {
    variety_id: Uuid,
    variety_name: String,
    cooking_type: String,
    quantity_kg: Decimal,
}

#[derive(Debug, FromRow)]
struct DatedQuantityRow {
    date: NaiveDate,
    cooking_type: String,
    quantity_kg: Decimal,
}

impl TryFrom<DatedQuantityRow> for DatedQuantity {
    type Error = AppError;

    fn try_from(row: DatedQuantityRow) -> Result<Self, Self::Error> {
        Ok(DatedQuantity {
            date: row.date,
            cooking_type: row.cooking_type.parse()?,
            quantity_kg: row.quantity_kg,
        })
    }
}

#[derive(Debug, FromRow)]
struct PlanRow {
    iso_year: i32,
    iso_week: i32,
    cooking_type: String,
    planned_kg: Decimal,
}

#[derive(Debug, FromRow)]
struct FarmerDeliveryRow {
    farmer_id: Uuid,
    farmer_name: String,
    variety_id: Uuid,
    variety_name: String,
    cooking_type: String,
    quantity_kg: Decimal,
    payout: Decimal,
}

#[derive(Debug, FromRow)]
struct EfficiencyRow {
    run_id: Uuid,
    run_date: NaiveDate,
    product_name: String,
    colli_packed: i32,
    raw_input_kg: Decimal,
    sorting_waste_kg: Decimal,
    unit_weight_kg: Decimal,
    units_per_colli: i32,
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Raw stock at the packing stations by cooking type and variety
    pub async fn raw_inventory(&self, station_id: Option<Uuid>) -> AppResult<RawInventoryReport> {
        let rows = sqlx::query_as::<_, VarietyQuantityRow>(
            r#"
            SELECT v.id AS variety_id, v.name AS variety_name, v.cooking_type, s.quantity AS quantity_kg
            FROM station_stock s
            JOIN varieties v ON v.id = s.variety_id
            WHERE s.quantity <> 0
              AND ($1::uuid IS NULL OR s.station_id = $1)
            "#,
        )
        .bind(station_id)
        .fetch_all(&self.db)
        .await?;

        let lines = rows
            .into_iter()
            .map(|r| {
                Ok(VarietyQuantity {
                    variety_id: r.variety_id,
                    variety_name: r.variety_name,
                    cooking_type: r.cooking_type.parse()?,
                    quantity_kg: r.quantity_kg,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(raw_inventory(&lines))
    }

    /// Kilograms received at the stations per ISO week and cooking type
    pub async fn weekly_summary(&self, filter: ReportFilter) -> AppResult<Vec<WeeklyCookingTypeTotal>> {
        filter.check()?;

        // Intake is dated by the delivery; cancelled deliveries do not count
        let rows = sqlx::query_as::<_, DatedQuantityRow>(
            r#"
            SELECT COALESCE(d.delivery_date, m.created_at::date) AS date,
                   v.cooking_type,
                   m.change_amount AS quantity_kg
            FROM station_stock_movements m
            JOIN varieties v ON v.id = m.variety_id
            LEFT JOIN deliveries d ON m.reference_type = 'delivery' AND d.id = m.reference_id
            WHERE m.reason = $1
              AND (d.id IS NULL OR d.status <> 'CANCELLED')
              AND ($2::date IS NULL OR COALESCE(d.delivery_date, m.created_at::date) >= $2)
              AND ($3::date IS NULL OR COALESCE(d.delivery_date, m.created_at::date) <= $3)
            "#,
        )
        .bind(MovementReason::RawInFromFarmer.as_str())
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        let entries = rows
            .into_iter()
            .map(DatedQuantity::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(aggregate_weekly(&entries))
    }

    /// Planned against delivered kilograms per ISO week and cooking type
    pub async fn plan_comparison(&self, filter: ReportFilter) -> AppResult<Vec<PlanComparisonRow>> {
        filter.check()?;

        let plan_rows = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT p.iso_year, p.iso_week, v.cooking_type, p.planned_kg
            FROM delivery_plans p
            JOIN varieties v ON v.id = p.variety_id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        let from_week = filter.from.map(IsoWeek::from_date);
        let to_week = filter.to.map(IsoWeek::from_date);

        let mut plans = Vec::with_capacity(plan_rows.len());
        for row in plan_rows {
            let week = validate_iso_week(row.iso_year, row.iso_week.max(0) as u32)
                .map_err(|m| AppError::Internal(format!("Stored delivery plan is invalid: {}", m)))?;
            if from_week.map_or(false, |f| week < f) || to_week.map_or(false, |t| week > t) {
                continue;
            }
            plans.push(PlannedQuantity {
                week,
                cooking_type: row.cooking_type.parse()?,
                planned_kg: row.planned_kg,
            });
        }

        // Plans are whole weeks, so deliveries are counted for the same whole weeks
        let (from, to) = widen_to_iso_weeks(filter.from, filter.to);
        let deliveries = self.recorded_deliveries(ReportFilter { from, to }).await?;
        Ok(compare_plan(&plans, &deliveries))
    }

    /// Per-farmer delivery totals, payouts and current stock
    pub async fn farmer_statistics(&self, filter: ReportFilter) -> AppResult<Vec<FarmerStatistics>> {
        filter.check()?;

        let rows = sqlx::query_as::<_, FarmerDeliveryRow>(
            r#"
            SELECT d.farmer_id, f.name AS farmer_name, d.variety_id, v.name AS variety_name,
                   v.cooking_type, d.quantity_kg,
                   d.quantity_kg * COALESCE(d.price_per_kg, 0) AS payout
            FROM deliveries d
            JOIN parties f ON f.id = d.farmer_id
            JOIN varieties v ON v.id = d.variety_id
            WHERE d.status = 'RECORDED'
              AND ($1::date IS NULL OR d.delivery_date >= $1)
              AND ($2::date IS NULL OR d.delivery_date <= $2)
            "#,
        )
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        let lines = rows
            .into_iter()
            .map(|r| {
                Ok(FarmerDeliveryLine {
                    farmer_id: r.farmer_id,
                    farmer_name: r.farmer_name,
                    variety_id: r.variety_id,
                    variety_name: r.variety_name,
                    cooking_type: r.cooking_type.parse()?,
                    quantity_kg: r.quantity_kg,
                    payout: r.payout,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        // Deactivated farmers keep their stock in the statistics while they have deliveries
        let delivering: Vec<Uuid> = lines
            .iter()
            .map(|l| l.farmer_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let stock: BTreeMap<Uuid, (String, Decimal)> = sqlx::query_as::<_, (Uuid, String, Decimal)>(
            r#"
            SELECT p.id, p.name, COALESCE(SUM(s.quantity), 0)
            FROM parties p
            LEFT JOIN farmer_stock s ON s.farmer_id = p.id
            WHERE p.kind = 'farmer' AND (p.is_active OR p.id = ANY($1))
            GROUP BY p.id, p.name
            "#,
        )
        .bind(&delivering)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(id, name, qty)| (id, (name, qty)))
        .collect();

        Ok(farmer_statistics(&lines, &stock))
    }

    /// Yield and loss per packaging run with period totals
    pub async fn packaging_efficiency(&self, filter: ReportFilter) -> AppResult<PackagingEfficiencyReport> {
        filter.check()?;

        let rows = sqlx::query_as::<_, EfficiencyRow>(
            r#"
            SELECT r.id AS run_id, r.run_date, p.name AS product_name, r.colli_packed,
                   r.raw_input_kg, r.sorting_waste_kg, p.unit_weight_kg, p.units_per_colli
            FROM packaging_runs r
            JOIN products p ON p.id = r.product_id
            WHERE ($1::date IS NULL OR r.run_date >= $1)
              AND ($2::date IS NULL OR r.run_date <= $2)
            ORDER BY r.run_date, r.created_at
            "#,
        )
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        let runs: Vec<PackagingEfficiencyRow> = rows
            .into_iter()
            .map(|r| {
                let packed = packed_weight_kg(Decimal::from(r.colli_packed), r.unit_weight_kg, r.units_per_colli);
                let y = calculate_packaging_yield(r.raw_input_kg, packed, r.sorting_waste_kg);
                PackagingEfficiencyRow {
                    run_id: r.run_id,
                    run_date: r.run_date,
                    product_name: r.product_name,
                    colli_packed: r.colli_packed,
                    raw_input_kg: r.raw_input_kg,
                    packed_weight_kg: y.packed_weight_kg,
                    sorting_waste_kg: r.sorting_waste_kg,
                    yield_percent: y.yield_percent,
                    loss_percent: y.loss_percent,
                }
            })
            .collect();

        let totals = calculate_packaging_yield(
            runs.iter().map(|r| r.raw_input_kg).sum(),
            runs.iter().map(|r| r.packed_weight_kg).sum(),
            runs.iter().map(|r| r.sorting_waste_kg).sum(),
        );

        Ok(PackagingEfficiencyReport { runs, totals })
    }

    /// Profit and loss statement over a date range
    pub async fn profit_and_loss(&self, filter: ReportFilter, currency: &str) -> AppResult<ProfitAndLoss> {
        filter.check()?;
        let to = filter.to.unwrap_or_else(|| Utc::now().date_naive());
        let from = filter.from.unwrap_or(to);
        if from > to {
            return Err(AppError::invalid("from", "Start date must not be after end date"));
        }

        let (revenue, colli_sold) = sqlx::query_as::<_, (Decimal, i64)>(
            r#"
            SELECT COALESCE(SUM(revenue), 0), COALESCE(SUM(quantity_colli), 0)::bigint
            FROM sales
            WHERE sale_date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        let farmer_payments = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity_kg * price_per_kg), 0)
            FROM deliveries
            WHERE status = 'RECORDED' AND price_per_kg IS NOT NULL
              AND delivery_date BETWEEN $1 AND $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        let packing_costs = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(packing_cost), 0) FROM packaging_runs WHERE run_date BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        let complaint_costs = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(cost), 0) FROM complaints WHERE complaint_date BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        let manual_costs = sqlx::query_scalar::<_, Decimal>(
            "SELECT COALESCE(SUM(amount), 0) FROM manual_costs WHERE cost_date BETWEEN $1 AND $2",
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.db)
        .await?;

        Ok(ProfitAndLoss::compute(
            from,
            to,
            currency,
            ProfitAndLossInputs {
                revenue,
                farmer_payments,
                packing_costs,
                complaint_costs,
                manual_costs,
                colli_sold,
            },
        ))
    }

    async fn recorded_deliveries(&self, filter: ReportFilter) -> AppResult<Vec<DatedQuantity>> {
        let rows = sqlx::query_as::<_, DatedQuantityRow>(
            r#"
            SELECT d.delivery_date AS date, v.cooking_type, d.quantity_kg
            FROM deliveries d
            JOIN varieties v ON v.id = d.variety_id
            WHERE d.status = 'RECORDED'
              AND ($1::date IS NULL OR d.delivery_date >= $1)
              AND ($2::date IS NULL OR d.delivery_date <= $2)
            "#,
        )
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(DatedQuantity::try_from).collect()
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
