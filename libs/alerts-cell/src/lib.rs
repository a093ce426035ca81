pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Alert, AlertCandidate, AlertsError, ValidatedAlert};
pub use router::alert_routes;
