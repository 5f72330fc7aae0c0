//! CLI Exit Code Registry
//!
//! Single source of truth for `stmtbook` exit codes. Scripts that drive the
//! monthly close rely on them.
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Success                                                        |
//! | 2    | Usage error (bad args, invalid period)                         |
//! | 60   | Invalid books config (parse or validation)                     |
//! | 61   | Runtime / IO error (unreadable file, cannot write output)      |
//! | 62   | Malformed statement input; at least one entry block skipped    |
//! | 63   | Reconciliation mismatch; entry files were still written        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the 60-69 range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in [`recon_exit_code`] if a `ReconError` can produce it

use stmtbook_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, month outside 1-12.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Statement books (60-69)
// =============================================================================

/// Books config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 60;

/// File could not be read or written.
pub const EXIT_RUNTIME: u8 = 61;

/// A statement record set was malformed. Independent blocks were still
/// booked and written.
pub const EXIT_MALFORMED_INPUT: u8 = 62;

/// Statement change in value does not equal dividends plus holdings change.
pub const EXIT_MISMATCH: u8 = 63;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        ReconError::InvalidPeriod { .. } => EXIT_USAGE,
        ReconError::MalformedInput { .. }
        | ReconError::MissingColumn { .. }
        | ReconError::SummaryRowCount { .. } => EXIT_MALFORMED_INPUT,
        ReconError::MissingInput { .. } | ReconError::Io(_) => EXIT_RUNTIME,
    }
}
