//! Exit code constants and error mapping for siteqa.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Every recorded stage passed |
//! | 1 | `FAILURE` | A stage failed, or setup aborted the run |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 130 | `INTERRUPTED` | Run cancelled by SIGINT / Ctrl-C |

use crate::error::SiteQaError;

/// Process exit code.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) for
/// `std::process::exit()`.
///
/// ```rust
/// use siteqa_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::INTERRUPTED, ExitCode::from_i32(130));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Every recorded stage passed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// At least one stage failed, or a fatal setup error stopped the run
    pub const FAILURE: ExitCode = ExitCode(1);

    /// Invalid command-line arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// User interrupt (128 + SIGINT)
    pub const INTERRUPTED: ExitCode = ExitCode(130);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Exit code for an aggregate pass/fail outcome.
    #[must_use]
    pub const fn from_passed(passed: bool) -> Self {
        if passed { Self::SUCCESS } else { Self::FAILURE }
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl SiteQaError {
    /// Map an error to the exit code the CLI should return.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            SiteQaError::Config(_) => ExitCode::CLI_ARGS,
            _ => ExitCode::FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ServerError};

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::FAILURE.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::INTERRUPTED.as_i32(), 130);
    }

    #[test]
    fn test_from_passed() {
        assert_eq!(ExitCode::from_passed(true), ExitCode::SUCCESS);
        assert_eq!(ExitCode::from_passed(false), ExitCode::FAILURE);
    }

    #[test]
    fn test_error_mapping() {
        let config = SiteQaError::Config(ConfigError::InvalidValue {
            key: "server.port".to_string(),
            value: "0".to_string(),
        });
        assert_eq!(config.to_exit_code(), ExitCode::CLI_ARGS);

        let server = SiteQaError::Server(ServerError::ExitedEarly {
            status: "exit status: 1".to_string(),
        });
        assert_eq!(server.to_exit_code(), ExitCode::FAILURE);

        let deps = SiteQaError::MissingDependencies {
            tools: vec!["jq".to_string()],
        };
        assert_eq!(deps.to_exit_code(), ExitCode::FAILURE);
    }

    #[test]
    fn test_i32_round_trip() {
        let code: i32 = ExitCode::INTERRUPTED.into();
        assert_eq!(ExitCode::from(code), ExitCode::INTERRUPTED);
    }
}
