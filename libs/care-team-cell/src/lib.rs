pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Anomaly, AvailableDoctor, CareTeamError, ConnectedDoctor, DoctorProfile, PatientDetails,
    PatientProfile, PatientSummary,
};
pub use router::{doctor_routes, settings_routes};
