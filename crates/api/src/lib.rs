#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`api`]: The facade (`KubescapeApi`) and its installed-state handling
//!
//! # Architecture
//!
//! ```text
//! setup(ui, config, cancel)
//!     +-- ArtifactInstaller::ensure_installed --> InstalledState (swapped whole)
//!
//! scan_yaml(ui, file, cancel)
//!     +-- ScanArgs + ScannerCommand    (installed scan frameworks, local bundles)
//!     +-- ProcessRunner::run           (ui.progress, cancellation)
//!     +-- parse_scan_output            --> ScanResults
//! ```

pub mod api;

// --- Public API Re-exports ---

pub use api::{KubescapeApi, TROUBLESHOOTING_URL};
