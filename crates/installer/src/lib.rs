#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`InstallerError`)
//! - [`version`]: Version resolution (`resolve_version`, `versions_match`, `extract_version`)
//! - [`source`]: Remote artifacts (`ArtifactSource` trait, `GithubSource`)
//! - [`manifest`]: Install record (`InstallManifest`)
//! - [`atomic`]: Atomic file replacement (`write_atomic`)
//! - [`installer`]: Orchestrator (`ArtifactInstaller`)
//!
//! # Architecture
//!
//! ```text
//! ArtifactInstaller::ensure_installed(ui, config, cancel)
//!     |
//!     +-- InstallManifest::load / probe_version   (what is on disk?)
//!     +-- resolve_version(source, request, local) (what should be on disk?)
//!     +-- ArtifactSource::fetch_binary            (ui.progress)
//!     +-- ArtifactSource::fetch_framework         (ui.slow, per framework)
//!     |
//!     v
//! InstalledState
//! ```

pub mod atomic;
pub mod error;
pub mod installer;
pub mod manifest;
pub mod source;
pub mod version;

// --- Public API Re-exports ---

pub use atomic::write_atomic;
pub use error::InstallerError;
pub use installer::{ArtifactInstaller, validate_framework};
pub use manifest::{InstallManifest, MANIFEST_FILE};
pub use source::{ArtifactSource, GithubSource};
pub use version::{ResolvedVersion, extract_version, resolve_version, versions_match};
