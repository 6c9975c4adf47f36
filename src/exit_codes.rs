//! Exit code constants for the batchkit CLI.
//!
//! - 0: Success (including "suppressed" and `--busy-ok` contention)
//! - 1: User error (bad args, invalid mnemonic, bad suppress directory)
//! - 2: Config failure (missing, unparseable or invalid config)
//! - 3: Lock failure (corrupt lock file, lock directory or lock I/O error)
//! - 4: Busy (another live instance holds the job lock)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// Config could not be located, parsed or validated.
pub const CONFIG_FAILURE: i32 = 2;

/// The job lock could not be inspected or written.
pub const LOCK_FAILURE: i32 = 3;

/// Another live instance already holds the job lock.
pub const BUSY: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, CONFIG_FAILURE, LOCK_FAILURE, BUSY];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn busy_is_not_success() {
        assert_ne!(BUSY, SUCCESS);
        assert_eq!(BUSY, 4);
    }
}
