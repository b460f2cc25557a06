// =====================================================================================
// AUDIT CELL - CANCELLATION LOG & RECOVERY
// =====================================================================================
//
// The database trigger records every deleted appointment in the cancellation
// log. This cell reads that log and rebuilds cancelled appointments from it:
// - Cancellation log browsing and purge
// - Recovery validation (references, duplicates, doctor conflicts)
// - Transactional recovery with alternative-slot suggestions
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    CancellationLogEntry, RecoveredAppointment, RecoveryError, RecoveryFailure, RecoveryReceipt,
    SuggestedSlot, ValidationReport,
};

pub use services::{CancellationLogService, RecoveryEngine};

pub use router::audit_routes;
