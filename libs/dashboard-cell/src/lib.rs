// =====================================================================================
// DASHBOARD CELL - SCHEDULING METRICS
// =====================================================================================
//
// Read-only aggregates over the appointment book: headline KPIs, rankings,
// specialty mix, a bucketed timeline and doctors with nothing scheduled.
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DashboardError, DashboardFilter, DashboardQuery, DashboardReport, TimelineGrouping};
pub use router::dashboard_routes;
pub use services::DashboardService;
