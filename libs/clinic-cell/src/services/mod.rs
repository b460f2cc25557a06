pub mod clinic;

pub use clinic::ClinicService;
