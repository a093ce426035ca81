pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentStatus, AvailabilityWindow, BookAppointmentRequest, BookedInterval,
    CreateAvailabilityRequest, SchedulingError, Slot,
};
pub use router::appointment_routes;
