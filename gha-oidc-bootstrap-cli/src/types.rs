//! CLI-specific type definitions.
//!
//! This module contains types that are specific to the CLI binary and should
//! not be part of the core library.

/// Exit codes for the CLI application.
///
/// These codes follow the documented convention where:
/// - 0 indicates successful completion
/// - 1 indicates a failure
/// - 3 indicates that an expected configuration file is missing
/// - any other code is forwarded from a failed AWS CLI invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success,

    /// Operation failed
    Error,

    /// A required input file (allow-list, rendered template) does not exist
    MissingConfig,

    /// Exit status of an external program, passed through unchanged
    External(i32),
}

impl ExitCode {
    /// Convert to the integer exit code for process::exit()
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::MissingConfig => 3,
            Self::External(code) => code,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(exit_code: ExitCode) -> Self {
        exit_code.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_distinct_from_usage_errors() {
        assert_eq!(i32::from(ExitCode::MissingConfig), 3);
        assert_ne!(ExitCode::MissingConfig.code(), 2);
    }

    #[test]
    fn test_external_code_is_forwarded() {
        assert_eq!(ExitCode::External(254).code(), 254);
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(ExitCode::Error.code(), 1);
    }
}
