// ABOUTME: Services-style invocation support: pasteboard reading and entry-point coordination
// ABOUTME: The default conversion waits a grace period so a service request can claim the run first

use anyhow::{Context, Result};
use std::process::Command;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

/// Selected text delivered by a Services-style invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub contents: String,
}

/// Coordinates the two possible entry points into one run. The default
/// conversion waits on the gate; a service request arriving within the grace
/// period claims the run instead. Whichever side the wait resolves to is the
/// only one that performs the file-system update.
pub struct ServiceGate {
    receiver: Receiver<ServiceRequest>,
}

impl ServiceGate {
    pub fn new() -> (Self, Sender<ServiceRequest>) {
        let (sender, receiver) = mpsc::channel();
        (ServiceGate { receiver }, sender)
    }

    /// Wait up to `grace` for a service request. `None` means no request
    /// arrived and the default path should run. Consumes the gate, so a
    /// request arriving later finds no listener.
    pub fn wait(self, grace: Duration) -> Option<ServiceRequest> {
        self.receiver.recv_timeout(grace).ok()
    }
}

/// Read the current text selection from the pasteboard.
pub fn read_selection() -> Result<String> {
    let output = Command::new("pbpaste")
        .output()
        .context("Failed to run pbpaste")?;
    if !output.status.success() {
        anyhow::bail!("pbpaste exited with {}", output.status);
    }
    String::from_utf8(output.stdout).context("Pasteboard contents are not valid UTF-8")
}
