//! Process exit codes for `certgate`.
//! These codes are part of the public contract; scripts branch on them.

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 1; // Bad flags, config file or key material
pub const INTERNAL_ERROR: i32 = 2; // I/O or trust store unreachable
pub const CANCELLED: i32 = 3; // Operator declined
pub const TRUST_FAILURE: i32 = 4; // Verification or policy failure
pub const CONSENT_ERROR: i32 = 5; // Consent provider failed
