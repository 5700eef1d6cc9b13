//! CLI-specific error types and exit code mapping

use kubescape_core::error::KubescapeError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Version resolution or artifact installation failed.
    #[error("setup failed: {0}")]
    Setup(String),

    /// The scanner is not installed.
    #[error("kubescape is not installed, run `ksctl setup` first")]
    NotInstalled,

    /// The scan ran and reported failed controls.
    #[error("scan found failing controls: {0}")]
    Findings(String),

    /// The scanner process failed.
    #[error("scanner failed: {0}")]
    Execution(String),

    /// The scanner output could not be parsed.
    #[error("unreadable scanner output: {0}")]
    Parse(String),

    /// Interrupted by the user.
    #[error("cancelled")]
    Cancelled,

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command / setup error       |
    /// | 2    | Configuration error                   |
    /// | 3    | Scanner not installed                 |
    /// | 4    | Scan reported failing controls        |
    /// | 5    | Scanner process failed                |
    /// | 6    | Scanner output unreadable             |
    /// | 10   | IO error                              |
    /// | 130  | Cancelled (Ctrl-C)                    |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::NotInstalled => 3,
            Self::Findings(_) => 4,
            Self::Execution(_) => 5,
            Self::Parse(_) => 6,
            Self::Io(_) => 10,
            Self::Cancelled => 130,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Setup(_) => 1,
        }
    }
}

impl From<KubescapeError> for CliError {
    fn from(e: KubescapeError) -> Self {
        match e {
            KubescapeError::Config(e) => Self::Config(e.to_string()),
            KubescapeError::NotInstalled => Self::NotInstalled,
            KubescapeError::Cancelled => Self::Cancelled,
            KubescapeError::Parse(e) => Self::Parse(e.to_string()),
            KubescapeError::Io(e) => Self::Io(e),
            e @ KubescapeError::Execution { .. } => Self::Execution(e.to_string()),
            e @ (KubescapeError::Resolution { .. } | KubescapeError::Install(_)) => {
                Self::Setup(e.to_string())
            }
        }
    }
}
