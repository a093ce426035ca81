pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    MetricReading, SleepRecord, TrendInputs, TrendSnapshot, TrendsResponse,
};
pub use router::{health_data_routes, reports_routes, trends_routes};
