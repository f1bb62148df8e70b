// ABOUTME: Typed view of contents.xcplayground: parse, version gate, page-list edits, serialize
// ABOUTME: The manifest is read whole, mutated in memory, and rewritten whole

use crate::playground::PlaygroundError;
use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};

pub const SUPPORTED_VERSION: (u32, u32) = (6, 0);

/// The XML index file describing bundle version, target platform, and the
/// page list. `pages` is `None` when the document carries no `pages`
/// element at all, which is distinct from an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub target_platform: String,
    pub requires_full_environment: bool,
    pub pages: Option<Vec<String>>,
}

impl Manifest {
    /// Manifest for a freshly created bundle, referencing its first page.
    pub fn new(target_platform: &str, first_page: &str) -> Self {
        Manifest {
            version: "6.0".to_string(),
            target_platform: target_platform.to_string(),
            requires_full_environment: true,
            pages: Some(vec![first_page.to_string()]),
        }
    }

    pub fn parse(xml: &str, bundle: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);

        let mut version: Option<String> = None;
        let mut target_platform = String::new();
        let mut requires_full_environment = false;
        let mut pages: Option<Vec<String>> = None;

        loop {
            let event = reader
                .read_event()
                .with_context(|| format!("Failed to parse manifest of playground \"{bundle}\""))?;
            match event {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"playground" => {
                        for attr in e.attributes() {
                            let attr = attr.with_context(|| {
                                format!("Bad manifest attribute in playground \"{bundle}\"")
                            })?;
                            let value = attr
                                .unescape_value()
                                .with_context(|| {
                                    format!("Bad manifest attribute in playground \"{bundle}\"")
                                })?
                                .into_owned();
                            match attr.key.as_ref() {
                                b"version" => version = Some(value),
                                b"target-platform" => target_platform = value,
                                b"requires-full-environment" => {
                                    requires_full_environment = value == "true";
                                }
                                _ => {}
                            }
                        }
                    }
                    b"pages" => {
                        pages.get_or_insert_with(Vec::new);
                    }
                    b"page" => {
                        for attr in e.attributes() {
                            let attr = attr.with_context(|| {
                                format!("Bad page attribute in playground \"{bundle}\"")
                            })?;
                            if attr.key.as_ref() == b"name" {
                                let name = attr
                                    .unescape_value()
                                    .with_context(|| {
                                        format!("Bad page attribute in playground \"{bundle}\"")
                                    })?
                                    .into_owned();
                                pages.get_or_insert_with(Vec::new).push(name);
                            }
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let version = match version {
            Some(v) if parse_version(&v).is_some() => v,
            _ => {
                return Err(PlaygroundError::VersionUndetectable {
                    bundle: bundle.to_string(),
                }
                .into());
            }
        };

        Ok(Manifest {
            version,
            target_platform,
            requires_full_environment,
            pages,
        })
    }

    /// Versions newer than the supported one are rejected; equal and older
    /// ones are accepted.
    pub fn ensure_supported_version(&self, bundle: &str) -> Result<()> {
        let Some(version) = parse_version(&self.version) else {
            return Err(PlaygroundError::VersionUndetectable {
                bundle: bundle.to_string(),
            }
            .into());
        };
        if version > SUPPORTED_VERSION {
            return Err(PlaygroundError::VersionUnsupported {
                bundle: bundle.to_string(),
                version: self.version.clone(),
            }
            .into());
        }
        Ok(())
    }

    pub fn has_pages(&self) -> bool {
        self.pages.is_some()
    }

    /// Drop entries matching the given names. No-op without a pages element.
    pub fn remove_pages(&mut self, names: &[String]) {
        if let Some(pages) = &mut self.pages {
            pages.retain(|page| !names.contains(page));
        }
    }

    /// Append a page entry, keeping names unique. No-op without a pages element.
    pub fn push_page(&mut self, name: &str) {
        if let Some(pages) = &mut self.pages {
            if !pages.iter().any(|page| page == name) {
                pages.push(name.to_string());
            }
        }
    }

    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .context("Failed to serialize manifest")?;

        let mut root = BytesStart::new("playground");
        root.push_attribute(("version", self.version.as_str()));
        root.push_attribute(("target-platform", self.target_platform.as_str()));
        if self.requires_full_environment {
            root.push_attribute(("requires-full-environment", "true"));
        }

        match &self.pages {
            Some(pages) => {
                writer
                    .write_event(Event::Start(root))
                    .context("Failed to serialize manifest")?;
                writer
                    .write_event(Event::Start(BytesStart::new("pages")))
                    .context("Failed to serialize manifest")?;
                for name in pages {
                    let mut page = BytesStart::new("page");
                    page.push_attribute(("name", name.as_str()));
                    writer
                        .write_event(Event::Empty(page))
                        .context("Failed to serialize manifest")?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new("pages")))
                    .context("Failed to serialize manifest")?;
                writer
                    .write_event(Event::End(BytesEnd::new("playground")))
                    .context("Failed to serialize manifest")?;
            }
            None => {
                writer
                    .write_event(Event::Empty(root))
                    .context("Failed to serialize manifest")?;
            }
        }

        let mut xml = String::from_utf8(writer.into_inner())
            .context("Manifest serialized to invalid UTF-8")?;
        xml.push('\n');
        Ok(xml)
    }
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(minor) => minor.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}
