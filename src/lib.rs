//! Cross-platform bundler for webshell desktop applications.
//!
//! Packages a Go-backed desktop application together with the webshell
//! runtime framework and a prebuilt electron runtime into OS-native
//! distributable bundles:
//! - macOS app bundles with a generated Info.plist
//! - Linux flat binaries
//! - Windows binaries with an embedded icon resource
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use bundler::Bundler;
pub use config::{Configuration, Environment, TargetOs};
pub use error::{Error, Result};
