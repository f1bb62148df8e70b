// ABOUTME: The playground domain: path layout, the typed manifest, and the update algorithm
// ABOUTME: Domain errors live here; plain I/O and XML failures pass through as anyhow errors

pub mod manifest;
pub mod paths;
pub mod update;

pub use update::{Playground, UpdateOutcome};

use thiserror::Error;

/// Errors with a domain meaning of their own. The manifest errors embed the
/// offending bundle name so the top-level handler can present it directly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaygroundError {
    #[error(
        "can't resolve a playground location: no path argument, no configured default_directory, and no desktop directory"
    )]
    CantResolveBundleLocation,

    #[error("playground \"{bundle}\" has no detectable manifest version")]
    VersionUndetectable { bundle: String },

    #[error("playground \"{bundle}\" has manifest version {version}, newer than the supported 6.0")]
    VersionUnsupported { bundle: String, version: String },
}
