// ABOUTME: Opens the playground bundle and the new page in the editor application
// ABOUTME: Everything here shells out to open/osascript; the editor's lifecycle is not owned

use crate::config::Config;
use crate::playground::UpdateOutcome;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Launch Services routes .playground bundles to Xcode when no alternate
/// editor application is configured.
const DEFAULT_EDITOR_APP_NAME: &str = "Xcode";

const LAUNCH_POLL_INTERVAL: Duration = Duration::from_secs(1);
const LAUNCH_POLL_ATTEMPTS: u32 = 60;

pub struct EditorLauncher {
    application: Option<String>,
    wait_before_opening_page: Duration,
}

impl EditorLauncher {
    pub fn new(config: &Config) -> Self {
        EditorLauncher {
            application: config.editor.application.clone(),
            wait_before_opening_page: Duration::from_secs(config.wait_before_opening_page()),
        }
    }

    /// Open the bundle, and for an already-existing bundle follow up with the
    /// new page once the editor has settled.
    pub fn open(&self, outcome: &UpdateOutcome) -> Result<()> {
        if outcome.created {
            return self.open_path(&outcome.bundle_dir);
        }

        let app_name = self.app_name();
        let was_running = is_app_running(&app_name);
        self.open_path(&outcome.bundle_dir)?;

        if !was_running {
            self.wait_until_running(&app_name);
        }
        debug!(
            "letting {} settle for {:?} before opening the page",
            app_name, self.wait_before_opening_page
        );
        thread::sleep(self.wait_before_opening_page);

        self.open_path(&outcome.page_dir)
    }

    fn app_name(&self) -> String {
        self.application
            .as_deref()
            .map(app_name_from_path)
            .unwrap_or_else(|| DEFAULT_EDITOR_APP_NAME.to_string())
    }

    fn open_path(&self, path: &Path) -> Result<()> {
        let mut cmd = Command::new("open");
        if let Some(app) = &self.application {
            cmd.args(["-a", app]);
        }
        cmd.arg(path);

        debug!("opening {}", path.display());
        let status = cmd
            .status()
            .with_context(|| format!("Failed to open {}", path.display()))?;
        if !status.success() {
            anyhow::bail!("open exited with {} for {}", status, path.display());
        }
        info!("opened {}", path.display());
        Ok(())
    }

    /// Block until the editor reports itself running. Bounded so a launch
    /// failure cannot hang the process forever.
    fn wait_until_running(&self, app_name: &str) {
        for _ in 0..LAUNCH_POLL_ATTEMPTS {
            if is_app_running(app_name) {
                return;
            }
            thread::sleep(LAUNCH_POLL_INTERVAL);
        }
        warn!("{app_name} never reported running; opening the page anyway");
    }
}

fn is_app_running(app_name: &str) -> bool {
    let script = format!("application \"{app_name}\" is running");
    match Command::new("osascript").args(["-e", &script]).output() {
        Ok(output) => String::from_utf8_lossy(&output.stdout).trim() == "true",
        Err(e) => {
            debug!("running check for '{app_name}' failed: {e}");
            false
        }
    }
}

/// Derive the application name used by the is-running query from a
/// configured path, e.g. "/Applications/Xcode-beta.app" -> "Xcode-beta".
fn app_name_from_path(path: &str) -> String {
    if let Some(bundle_end) = path.find(".app") {
        let app_path = &path[..bundle_end];
        let start = app_path.rfind('/').map(|i| i + 1).unwrap_or(0);
        return app_path[start..].to_string();
    }

    let start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    path[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MIN_WAIT_SECONDS;

    #[test]
    fn test_app_name_from_app_bundle_path() {
        assert_eq!(app_name_from_path("/Applications/Xcode.app"), "Xcode");
        assert_eq!(app_name_from_path("/Applications/Xcode-beta.app"), "Xcode-beta");
        assert_eq!(
            app_name_from_path("/Applications/Xcode.app/Contents/MacOS/Xcode"),
            "Xcode"
        );
    }

    #[test]
    fn test_app_name_from_bare_name() {
        assert_eq!(app_name_from_path("Xcode"), "Xcode");
        assert_eq!(app_name_from_path("/usr/local/bin/some-editor"), "some-editor");
    }

    #[test]
    fn test_launcher_defaults_to_xcode() {
        let launcher = EditorLauncher::new(&Config::default());
        assert_eq!(launcher.app_name(), "Xcode");
    }

    #[test]
    fn test_launcher_uses_configured_application() {
        let mut config = Config::default();
        config.editor.application = Some("/Applications/Xcode-beta.app".to_string());

        let launcher = EditorLauncher::new(&config);
        assert_eq!(launcher.app_name(), "Xcode-beta");
    }

    #[test]
    fn test_launcher_clamps_settle_period() {
        let mut config = Config::default();
        config.editor.wait_seconds_before_opening_page = 0;

        let launcher = EditorLauncher::new(&config);
        assert_eq!(
            launcher.wait_before_opening_page,
            Duration::from_secs(MIN_WAIT_SECONDS)
        );
    }
}
