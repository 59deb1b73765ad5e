use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::models::errors::{CatalogError, ErrorExt, ErrorKind};
use crate::Result;

/// The native host an asset can be installed through.
pub trait HostBridge {
    fn start_download(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Delegated,
    /// No host available; the url is handed to the user to open themselves.
    OpenInBrowser { url: String, alert: String },
}

pub fn install(bridge: Option<&dyn HostBridge>, url: &str) -> Result<InstallOutcome> {
    match bridge {
        Some(bridge) => {
            bridge.start_download(url)?;
            Ok(InstallOutcome::Delegated)
        }
        None => Ok(InstallOutcome::OpenInBrowser {
            url: url.to_owned(),
            alert: "Download started in your browser. Extract the archive into the game folder manually.".to_owned(),
        }),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, Serialize, Deserialize)]
pub enum DownloadStatus {
    #[serde(rename = "Downloading...")]
    #[strum(serialize = "Downloading...")]
    Downloading,
    #[serde(rename = "Extracting...")]
    #[strum(serialize = "Extracting...")]
    Extracting,
    Completed,
    Error,
}

impl DownloadStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Error)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: DownloadStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
}

type Listener = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// The single slot a host reports download progress into. A view installs its
/// listener on mount and the returned guard removes it again on unmount.
#[derive(Clone, Default)]
pub struct ProgressHub {
    slot: Arc<Mutex<Option<(u64, Listener)>>>,
    generation: Arc<AtomicU64>,
}

#[must_use = "dropping the guard removes the listener"]
pub struct ProgressGuard {
    slot: Arc<Mutex<Option<(u64, Listener)>>>,
    generation: u64,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            // A later install owns the slot now.
            if matches!(slot.as_ref(), Some((g, _)) if *g == self.generation) {
                *slot = None;
            }
        }
    }
}

impl ProgressHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install<F>(&self, listener: F) -> ProgressGuard
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some((generation, Arc::new(listener)));
        }

        ProgressGuard {
            slot: self.slot.clone(),
            generation,
        }
    }

    #[cfg(test)]
    pub fn is_installed(&self) -> bool {
        self.slot.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Returns false when nobody is listening.
    pub fn dispatch(&self, event: &ProgressEvent) -> bool {
        let listener = match self.slot.lock() {
            Ok(slot) => slot.as_ref().map(|(_, l)| l.clone()),
            Err(_) => None,
        };

        match listener {
            Some(listener) => {
                listener(event);
                true
            }
            None => false,
        }
    }

    /// Parses one update as the host sends it and forwards it. Returns the
    /// status when a listener received it.
    pub fn dispatch_json(&self, raw: &str) -> Result<Option<DownloadStatus>> {
        let event = serde_json::from_str::<ProgressEvent>(raw)
            .context("Host sent an unreadable progress update")?;

        Ok(self.dispatch(&event).then_some(event.status))
    }
}

/// Hands downloads to an external program. The program receives the url as
/// its only argument and reports progress as one JSON [`ProgressEvent`] per
/// stdout line.
pub struct ExternalDownloader {
    program: String,
    hub: ProgressHub,
}

impl ExternalDownloader {
    pub fn new<S: Into<String>>(program: S, hub: ProgressHub) -> Self {
        Self {
            program: program.into(),
            hub,
        }
    }
}

impl HostBridge for ExternalDownloader {
    fn start_download(&self, url: &str) -> Result<()> {
        let mut child = Command::new(&self.program)
            .arg(url)
            .stdout(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CatalogError::new(ErrorKind::Io, "Downloader has no stdout")
        })?;

        let hub = self.hub.clone();

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut finished = false;

            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }

                match hub.dispatch_json(&line) {
                    Ok(Some(status)) => finished |= status.is_final(),
                    Ok(None) => {}
                    Err(e) => warn!("{}", e),
                }
            }

            let exit = match child.wait().await {
                Ok(status) => format!("Downloader exited with {}", status),
                Err(e) => format!("Downloader failed: {}", e),
            };

            debug!("{}", exit);

            // Listeners wait for a final status; make sure they get one.
            if !finished {
                hub.dispatch(&ProgressEvent {
                    status: DownloadStatus::Error,
                    progress: None,
                    message: Some(exit),
                });
            }
        });

        Ok(())
    }
}
