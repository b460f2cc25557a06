pub mod agenda;
pub mod booking;
pub mod conflict;
pub mod references;

pub use agenda::AgendaPeriod;
pub use booking::AppointmentBookingService;
pub use references::ReferenceKind;
