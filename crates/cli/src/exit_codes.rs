//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                                      |
//! |------|--------------------------------------------------------------|
//! | 0    | Success                                                      |
//! | 1    | General error (unspecified)                                  |
//! | 2    | Usage error: bad arguments, invalid key or mistyped value    |
//! | 3    | Key not found (`get` without `--default`)                    |
//! | 4    | Persistence failure: store unreadable or flush failed        |

use prefkit_store::SettingsError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, invalid key, value not of the requested type,
/// bad configuration file.
pub const EXIT_USAGE: u8 = 2;

/// `get` found no value of the requested type and no default was given.
pub const EXIT_NOT_FOUND: u8 = 3;

/// The store could not be read, or changes could not be flushed.
pub const EXIT_PERSIST: u8 = 4;

/// Map a SettingsError to its exit code.
pub fn settings_exit_code(err: &SettingsError) -> u8 {
    if err.is_invalid_argument() {
        return EXIT_USAGE;
    }
    if err.is_persistence() {
        return EXIT_PERSIST;
    }
    match err {
        SettingsError::Config(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    }
}
