pub mod crypto;
pub mod guard;
pub mod json_strict;
pub mod ledger;
pub mod mandate;

// Convenience re-exports
pub use guard::{
    ChargeRequest, DenyReason, ExecutionDecision, GuardPolicy, MandateGuard, MandateStatus,
    RejectionKind, Verification,
};
pub use ledger::{LedgerError, MemoryLedger, RevocationLedger, RevocationRecord, SqliteLedger};
pub use mandate::{MandateBody, SchemaErrors, SignedMandate};
