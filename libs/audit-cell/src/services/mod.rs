pub mod log;
pub mod recovery;

pub use log::CancellationLogService;
pub use recovery::RecoveryEngine;
