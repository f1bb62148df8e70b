// ABOUTME: Configuration structures and parsing for playground naming, page handling, and editor launch
// ABOUTME: Replaces the old ambient user-defaults keys with an explicit TOML file loaded once at startup

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Follow-up opens are unreliable while Xcode is still settling, so the
/// configured grace period is clamped up to this floor.
pub const MIN_WAIT_SECONDS: u64 = 3;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub playground: PlaygroundConfig,
    pub page: PageConfig,
    pub editor: EditorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PlaygroundConfig {
    pub default_directory: Option<String>,
    pub target_platform: String,
    pub default_contents: String,
    pub name_prefix: String,
    pub name_date_format: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub name_prefix: String,
    pub name_date_format: String,
    pub mark_used_if_from_services: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub application: Option<String>,
    pub wait_seconds_before_opening_page: u64,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        PlaygroundConfig {
            default_directory: None,
            target_platform: "osx".to_string(),
            default_contents: "var str = \"Hello, playground\"".to_string(),
            name_prefix: "PlayNow-".to_string(),
            name_date_format: "%Y%m%d".to_string(),
        }
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        PageConfig {
            name_prefix: String::new(),
            name_date_format: "%H%M%S".to_string(),
            mark_used_if_from_services: true,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            application: None,
            wait_seconds_before_opening_page: MIN_WAIT_SECONDS,
        }
    }
}

impl Config {
    pub fn default_config_content() -> &'static str {
        r#"# PlayNow Configuration
# Every key is optional; missing keys fall back to the defaults shown here.

[playground]
# Where new playgrounds are created when no path argument is given.
# Falls back to the Desktop when unset.
# default_directory = "~/Playgrounds"

# Written into the manifest's target-platform attribute ("osx" or "ios").
target_platform = "osx"

# Page body used when no content is supplied.
default_contents = 'var str = "Hello, playground"'

# New bundles are named <name_prefix><date>, e.g. PlayNow-20250905.playground
name_prefix = "PlayNow-"
name_date_format = "%Y%m%d"

[page]
# New pages are named <name_prefix><time>, e.g. 153042
name_prefix = ""
name_date_format = "%H%M%S"

# Pages created from a Services invocation carry real content, so their
# modification time is advanced past the unused-page threshold to keep the
# next run from pruning them.
mark_used_if_from_services = true

[editor]
# Alternate editor application bundle. Defaults to whatever the system
# associates with .playground (normally Xcode).
# application = "/Applications/Xcode-beta.app"

# Seconds to let the editor settle before the follow-up page open.
# Values below 3 are clamped up to 3.
wait_seconds_before_opening_page = 3
"#
    }

    pub fn load_from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse configuration")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::load_from_str(&content)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to determine config directory")?;
        Ok(config_dir.join("playnow").join("config.toml"))
    }

    pub fn expand_paths(&mut self) -> Result<()> {
        if let Some(dir) = &self.playground.default_directory {
            self.playground.default_directory = Some(expand_tilde(dir)?);
        }
        if let Some(app) = &self.editor.application {
            self.editor.application = Some(expand_tilde(app)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.playground.name_date_format.is_empty() {
            anyhow::bail!("playground.name_date_format cannot be empty");
        }
        if self.page.name_date_format.is_empty() {
            anyhow::bail!("page.name_date_format cannot be empty");
        }
        validate_date_format("playground.name_date_format", &self.playground.name_date_format)?;
        validate_date_format("page.name_date_format", &self.page.name_date_format)?;

        if let Some(app) = &self.editor.application {
            if app.is_empty() {
                anyhow::bail!("editor.application cannot be an empty string");
            }
        }

        Ok(())
    }

    /// Grace period before the follow-up page open, clamped to the floor.
    pub fn wait_before_opening_page(&self) -> u64 {
        self.editor.wait_seconds_before_opening_page.max(MIN_WAIT_SECONDS)
    }

    pub fn save_default_config(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        fs::write(path, Self::default_config_content())
            .with_context(|| format!("Failed to write default config to: {}", path.display()))?;

        Ok(())
    }
}

fn validate_date_format(key: &str, format: &str) -> Result<()> {
    let has_error = StrftimeItems::new(format).any(|item| matches!(item, Item::Error));
    if has_error {
        anyhow::bail!("{key} is not a valid date format: {format:?}");
    }
    Ok(())
}

fn expand_tilde(path: &str) -> Result<String> {
    if path.starts_with("~/") {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home.join(&path[2..]).to_string_lossy().into_owned())
    } else {
        Ok(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = Config::load_from_str("").unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.playground.target_platform, "osx");
        assert_eq!(config.playground.name_prefix, "PlayNow-");
        assert_eq!(config.playground.name_date_format, "%Y%m%d");
        assert_eq!(config.page.name_date_format, "%H%M%S");
        assert_eq!(config.page.mark_used_if_from_services, true);
        assert_eq!(config.editor.application, None);
    }

    #[test]
    fn test_parse_partial_config_keeps_other_defaults() {
        let config_str = r#"
[playground]
target_platform = "ios"
name_prefix = "Scratch-"

[editor]
wait_seconds_before_opening_page = 10
"#;

        let config = Config::load_from_str(config_str).unwrap();

        assert_eq!(config.playground.target_platform, "ios");
        assert_eq!(config.playground.name_prefix, "Scratch-");
        assert_eq!(config.playground.name_date_format, "%Y%m%d"); // Default value
        assert_eq!(config.page.mark_used_if_from_services, true); // Default value
        assert_eq!(config.editor.wait_seconds_before_opening_page, 10);
    }

    #[test]
    fn test_parse_invalid_config_wrong_type() {
        let config_str = r#"
[page]
mark_used_if_from_services = "yes"  # Should be boolean
"#;

        let result = Config::load_from_str(config_str);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse configuration"));
    }

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        let home_str = home.to_string_lossy();

        assert_eq!(expand_tilde("~/Playgrounds").unwrap(), format!("{}/Playgrounds", home_str));
        assert_eq!(expand_tilde("/absolute/path").unwrap(), "/absolute/path");
        assert_eq!(expand_tilde("relative/path").unwrap(), "relative/path");
    }

    #[test]
    fn test_config_expand_paths() {
        let config_str = r#"
[playground]
default_directory = "~/Playgrounds"

[editor]
application = "~/Applications/Xcode.app"
"#;

        let mut config = Config::load_from_str(config_str).unwrap();
        config.expand_paths().unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(
            config.playground.default_directory.as_deref().unwrap(),
            home.join("Playgrounds").to_string_lossy()
        );
        assert_eq!(
            config.editor.application.as_deref().unwrap(),
            home.join("Applications/Xcode.app").to_string_lossy()
        );
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path().unwrap();
        assert!(path.to_string_lossy().contains("playnow"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_validate_empty_date_format() {
        let mut config = Config::default();
        config.page.name_date_format = String::new();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("page.name_date_format"));
    }

    #[test]
    fn test_validate_bad_date_format() {
        let mut config = Config::default();
        config.playground.name_date_format = "%Q".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a valid date format"));
    }

    #[test]
    fn test_validate_empty_editor_application() {
        let mut config = Config::default();
        config.editor.application = Some(String::new());

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("editor.application"));
    }

    #[test]
    fn test_wait_before_opening_page_is_clamped() {
        let mut config = Config::default();
        config.editor.wait_seconds_before_opening_page = 0;
        assert_eq!(config.wait_before_opening_page(), MIN_WAIT_SECONDS);

        config.editor.wait_seconds_before_opening_page = 10;
        assert_eq!(config.wait_before_opening_page(), 10);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_content_can_be_parsed() {
        let content = Config::default_config_content();
        let config = Config::load_from_str(content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config, Config::default());
    }
}
