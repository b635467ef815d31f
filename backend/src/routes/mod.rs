//! Route definitions for the farm cooperative platform

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Master data
        .nest("/parties", party_routes())
        .nest("/varieties", variety_routes())
        .nest("/products", product_routes())
        // Stock ledgers
        .nest("/stock", stock_routes())
        // Farm to station
        .nest("/deliveries", delivery_routes())
        .route(
            "/direct-sales",
            get(handlers::list_direct_sales).post(handlers::create_direct_sale),
        )
        .route(
            "/delivery-plans",
            get(handlers::list_delivery_plans).put(handlers::upsert_delivery_plan),
        )
        // Station to customer
        .nest("/orders", order_routes())
        .nest("/packaging-runs", packaging_routes())
        .nest("/sales", sale_routes())
        .nest("/complaints", complaint_routes())
        // Money
        .nest("/prices", pricing_routes())
        .nest("/costs", cost_routes())
        .nest("/reports", report_routes())
}

fn party_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_parties).post(handlers::create_party))
        .route("/:id", get(handlers::get_party).put(handlers::update_party))
}

fn variety_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_varieties).post(handlers::create_variety))
        .route("/:id", get(handlers::get_variety).put(handlers::update_variety))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route("/:id", get(handlers::get_product).put(handlers::update_product))
}

/// Ledger routes, `:kind` is `farmer`, `packing_station` or `packing_plant`
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/:kind/:owner_id/balances", get(handlers::list_balances))
        .route(
            "/:kind/:owner_id/movements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route("/:kind/:owner_id/inventory", post(handlers::take_inventory))
        .route("/:kind/:owner_id/reconcile", get(handlers::reconcile))
}

fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_deliveries).post(handlers::create_delivery))
        .route("/:id", get(handlers::get_delivery))
        .route("/:id/cancel", post(handlers::cancel_delivery))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/:id", get(handlers::get_order))
        .route("/:id/status", patch(handlers::update_order_status))
}

fn packaging_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_packaging_runs).post(handlers::create_packaging_run))
        .route("/:id", get(handlers::get_packaging_run))
}

fn sale_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_sales).post(handlers::create_sale))
        .route("/:id", get(handlers::get_sale))
}

fn complaint_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_complaints).post(handlers::create_complaint))
        .route("/:id", get(handlers::get_complaint))
}

fn pricing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/customer",
            get(handlers::list_customer_prices).post(handlers::create_customer_price),
        )
        .route("/customer/resolve", get(handlers::resolve_customer_price))
        .route(
            "/farmer",
            get(handlers::list_farmer_prices).post(handlers::create_farmer_price),
        )
        .route("/farmer/resolve", get(handlers::resolve_farmer_price))
}

fn cost_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_costs).post(handlers::create_cost))
        .route("/:id", delete(handlers::delete_cost))
}

fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/raw-inventory", get(handlers::get_raw_inventory))
        .route("/weekly-summary", get(handlers::get_weekly_summary))
        .route("/plan-comparison", get(handlers::get_plan_comparison))
        .route("/farmer-statistics", get(handlers::get_farmer_statistics))
        .route("/packaging-efficiency", get(handlers::get_packaging_efficiency))
        .route("/profit-and-loss", get(handlers::get_profit_and_loss))
}
