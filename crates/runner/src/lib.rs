#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`RunnerError`)
//! - [`command`]: Command line assembly (`build_command`, `ScannerCommand`, `ScanArgs`)
//! - [`process`]: Child process execution with cancellation (`ProcessRunner`)
//! - [`parser`]: Scanner output parsing (`parse_scan_output`, `parse_framework_list`)
//!
//! # Flow
//!
//! ```text
//! ScanArgs --build--> args
//!    |
//! build_command(path, args, kubeconfig, platform) --> command line
//!    |
//! ProcessRunner::run(ui, line, cancel, progress) --> stdout
//!    |
//! parse_scan_output(stdout) --> ScanResults
//! ```

pub mod command;
pub mod error;
pub mod parser;
pub mod process;

// --- Public API Re-exports ---

pub use command::{ScanArgs, ScanTarget, ScannerCommand, build_command};
pub use error::RunnerError;
pub use parser::{parse_framework_list, parse_scan_output};
pub use process::{DEFAULT_TICK_INTERVAL, ProcessRunner};
