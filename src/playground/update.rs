// ABOUTME: The create-or-append update that keeps a playground's manifest consistent with its pages
// ABOUTME: Pages never touched after creation are detected by timestamp delta and evicted next run

use crate::config::Config;
use crate::playground::manifest::Manifest;
use crate::playground::paths::{self, Bundle, Page};
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// A page whose contents were modified less than this long after creation is
/// considered never touched by the user. The heuristic is approximate: a page
/// genuinely edited within the window is misclassified.
pub const UNUSED_THRESHOLD: Duration = Duration::from_secs(2);

/// One pending conversion: the resolved bundle, the page to add, and the
/// rendered page contents.
pub struct Playground {
    bundle: Bundle,
    page: Page,
    contents: String,
    target_platform: String,
}

/// Handed to the launcher: where the bundle lives and whether it had to be
/// created. An already-existing bundle gets a follow-up open of the new page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub bundle_dir: PathBuf,
    pub page_dir: PathBuf,
    pub created: bool,
}

impl Playground {
    pub fn new(input: Option<&Path>, contents: Option<&str>, config: &Config) -> Result<Self> {
        let now = Local::now();
        let bundle = Bundle::new(paths::resolve_bundle_dir(input, &config.playground, now)?);
        let page = bundle.page(&paths::page_name(&config.page, now));
        Ok(Playground {
            bundle,
            page,
            contents: render_contents(contents, &config.playground.default_contents),
            target_platform: config.playground.target_platform.clone(),
        })
    }

    /// Create the bundle or append a page to it, depending on whether its
    /// manifest already exists.
    pub fn update(&self) -> Result<UpdateOutcome> {
        let created = if self.bundle.manifest_path().exists() {
            self.append_page()?;
            false
        } else {
            self.create_bundle()?;
            true
        };

        Ok(UpdateOutcome {
            bundle_dir: self.bundle.base_dir().to_path_buf(),
            page_dir: self.page.dir().to_path_buf(),
            created,
        })
    }

    fn create_bundle(&self) -> Result<()> {
        fs::create_dir_all(self.bundle.base_dir()).with_context(|| {
            format!("Failed to create bundle directory {}", self.bundle.base_dir().display())
        })?;

        let manifest_path = self.bundle.manifest_path();
        let manifest = Manifest::new(&self.target_platform, self.page.name());
        write_new(&manifest_path, manifest.to_xml()?.as_bytes())
            .with_context(|| format!("Failed to write manifest {}", manifest_path.display()))?;

        fs::create_dir_all(self.page.dir()).with_context(|| {
            format!("Failed to create page directory {}", self.page.dir().display())
        })?;
        let contents_path = self.page.contents_path();
        write_new(&contents_path, self.contents.as_bytes())
            .with_context(|| format!("Failed to write page contents {}", contents_path.display()))?;

        info!("created playground {}", self.bundle.base_dir().display());
        Ok(())
    }

    fn append_page(&self) -> Result<()> {
        let bundle_name = self.bundle.name();
        let manifest_path = self.bundle.manifest_path();
        let xml = fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read manifest {}", manifest_path.display()))?;
        let mut manifest = Manifest::parse(&xml, &bundle_name)?;
        manifest.ensure_supported_version(&bundle_name)?;

        // Collected before the new page exists on disk.
        let unused = self.unused_pages()?;

        fs::create_dir_all(self.page.dir()).with_context(|| {
            format!("Failed to create page directory {}", self.page.dir().display())
        })?;
        let contents_path = self.page.contents_path();
        match write_new(&contents_path, self.contents.as_bytes()) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // The time-based page name collided with one generated earlier
                // in the same time unit; keep the existing file.
                debug!("page contents already exist at {}, keeping them", contents_path.display());
            }
            other => other.with_context(|| {
                format!("Failed to write page contents {}", contents_path.display())
            })?,
        }

        let mut pruned = Vec::new();
        for page in &unused {
            match fs::remove_dir_all(page.dir()) {
                Ok(()) => pruned.push(page.name().to_string()),
                Err(e) => debug!("leaving unused page {} in place: {e}", page.dir().display()),
            }
        }

        if manifest.has_pages() {
            manifest.remove_pages(&pruned);
            manifest.push_page(self.page.name());
            write_atomic(&manifest_path, manifest.to_xml()?.as_bytes())?;
        }

        info!(
            "added page {} to playground {}",
            self.page.name(),
            self.bundle.base_dir().display()
        );
        Ok(())
    }

    /// Pages under the bundle whose contents were never touched after
    /// creation. The page currently being added is never included, and pages
    /// with unreadable timestamps are left alone.
    fn unused_pages(&self) -> Result<Vec<Page>> {
        let pages_dir = self.bundle.pages_dir();
        if !pages_dir.exists() {
            return Ok(Vec::new());
        }

        let mut unused = Vec::new();
        let entries = fs::read_dir(&pages_dir)
            .with_context(|| format!("Failed to list pages in {}", pages_dir.display()))?;
        for entry in entries {
            let path = entry
                .with_context(|| format!("Failed to list pages in {}", pages_dir.display()))?
                .path();
            if !path.is_dir()
                || path.extension().and_then(|e| e.to_str()) != Some(paths::PAGE_EXTENSION)
            {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if name == self.page.name() {
                continue;
            }

            let page = self.bundle.page(name);
            if let Some((created, modified)) = page_timestamps(&page) {
                let age = modified.duration_since(created).unwrap_or_default();
                if age < UNUSED_THRESHOLD {
                    unused.push(page);
                }
            }
        }
        Ok(unused)
    }

    /// Advance the page's modification time past the unused threshold so the
    /// next run never prunes it. Invoked for service-created pages, whose
    /// contents are intentionally authored rather than a throwaway stub.
    pub fn mark_page_as_used(&self) -> Result<()> {
        let contents_path = self.page.contents_path();
        let Some((created, _)) = page_timestamps(&self.page) else {
            anyhow::bail!("page {} has no readable timestamps", self.page.name());
        };

        let touched = created + UNUSED_THRESHOLD + Duration::from_secs(1);
        filetime::set_file_mtime(&contents_path, filetime::FileTime::from_system_time(touched))
            .with_context(|| format!("Failed to touch {}", contents_path.display()))?;
        debug!("marked page {} as used", self.page.name());
        Ok(())
    }
}

/// Page contents template: navigation markers around the default import and
/// the supplied body.
fn render_contents(contents: Option<&str>, default_contents: &str) -> String {
    [
        "//: [Previous](@previous)",
        "",
        "import Foundation",
        "",
        contents.unwrap_or(default_contents),
        "",
        "//: [Next](@next)",
    ]
    .join("\n")
}

/// Creation and modification times of a page's contents file. Falls back to
/// the page directory's mtime where the filesystem records no birth time; the
/// directory is stamped when the page is created and edits to the contents
/// file do not advance it.
fn page_timestamps(page: &Page) -> Option<(SystemTime, SystemTime)> {
    let contents = fs::metadata(page.contents_path()).ok()?;
    let modified = contents.modified().ok()?;
    let created = contents
        .created()
        .or_else(|_| fs::metadata(page.dir()).and_then(|dir| dir.modified()))
        .ok()?;
    Some((created, modified))
}

fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(data)
}

/// Overwrite via a temp file in the same directory so a crash mid-write never
/// leaves a truncated manifest.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("manifest");
    let tmp = dir.join(format!(".{file_name}.tmp"));

    fs::write(&tmp, data).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace {} with {}", path.display(), tmp.display()))
}
