// ABOUTME: On-disk layout of a playground bundle and resolution of where a new one lives
// ABOUTME: Bundle and page names combine configured prefixes with the invocation date

use crate::config::{PageConfig, PlaygroundConfig};
use crate::playground::PlaygroundError;
use anyhow::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

pub const BUNDLE_EXTENSION: &str = "playground";
pub const MANIFEST_FILE_NAME: &str = "contents.xcplayground";
pub const PAGES_DIR_NAME: &str = "Pages";
pub const PAGE_EXTENSION: &str = "xcplaygroundpage";
pub const CONTENTS_FILE_NAME: &str = "Contents.swift";

/// The on-disk directory holding one playground: a manifest plus a Pages
/// subdirectory. The bundle may not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    base_dir: PathBuf,
}

impl Bundle {
    pub fn new(base_dir: PathBuf) -> Self {
        Bundle { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Display name for error messages, without the bundle extension.
    pub fn name(&self) -> String {
        self.base_dir
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.base_dir.display().to_string())
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join(MANIFEST_FILE_NAME)
    }

    pub fn pages_dir(&self) -> PathBuf {
        self.base_dir.join(PAGES_DIR_NAME)
    }

    pub fn page(&self, name: &str) -> Page {
        Page {
            name: name.to_string(),
            dir: self.pages_dir().join(format!("{name}.{PAGE_EXTENSION}")),
        }
    }
}

/// A named sub-unit of a bundle holding one editable contents file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    name: String,
    dir: PathBuf,
}

impl Page {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn contents_path(&self) -> PathBuf {
        self.dir.join(CONTENTS_FILE_NAME)
    }
}

/// Decide which playground bundle a run operates on.
///
/// A path that already carries the bundle extension is used as-is; any other
/// path gets a generated bundle name appended. Without a path the configured
/// default directory and then the Desktop are tried.
pub fn resolve_bundle_dir(
    input: Option<&Path>,
    config: &PlaygroundConfig,
    now: DateTime<Local>,
) -> Result<PathBuf> {
    if let Some(path) = input {
        if path.extension().and_then(|e| e.to_str()) == Some(BUNDLE_EXTENSION) {
            return Ok(path.to_path_buf());
        }
        return Ok(path.join(bundle_file_name(config, now)));
    }

    if let Some(dir) = &config.default_directory {
        return Ok(Path::new(dir).join(bundle_file_name(config, now)));
    }

    if let Some(desktop) = dirs::desktop_dir() {
        return Ok(desktop.join(bundle_file_name(config, now)));
    }

    Err(PlaygroundError::CantResolveBundleLocation.into())
}

pub fn bundle_file_name(config: &PlaygroundConfig, now: DateTime<Local>) -> String {
    format!(
        "{}{}.{BUNDLE_EXTENSION}",
        config.name_prefix,
        now.format(&config.name_date_format)
    )
}

pub fn page_name(config: &PageConfig, now: DateTime<Local>) -> String {
    sanitize_page_name(&format!(
        "{}{}",
        config.name_prefix,
        now.format(&config.name_date_format)
    ))
}

/// Replace characters a page name may not carry with "_".
/// The restriction on page names is tighter than on ordinary file names.
pub fn sanitize_page_name(name: &str) -> String {
    name.replace(['\\', ':', '/'], "_")
}
