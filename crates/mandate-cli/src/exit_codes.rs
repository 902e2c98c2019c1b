//! Process exit codes.
//! These codes are part of the public contract; scripts branch on them.

pub const SUCCESS: i32 = 0;
pub const ERROR: i32 = 1; // I/O, ledger or other runtime failure
pub const CONFIG_ERROR: i32 = 2; // Unreadable policy, ledger path or key
pub const DENIED: i32 = 3; // Revoked, outside the validity window, or charge refused
pub const INVALID: i32 = 4; // Schema or signature failure
