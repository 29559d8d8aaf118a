//! Foreground side of the installer: starts at most one install worker and
//! relays its events.

use crate::pipeline::{InstallEvent, InstallOutcome, InstallPipeline, InstallRequest};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("an install is already running")]
    Busy,
    #[error("no install directory selected")]
    NoInstallDir,
}

/// A running install worker.
pub struct InstallHandle {
    events: UnboundedReceiver<InstallEvent>,
    worker: JoinHandle<InstallOutcome>,
}

#[derive(Default)]
pub struct Session {
    active: Option<InstallHandle>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Spawn the install worker. Refused while another install is running
    /// or when no install directory was given.
    pub fn start(&mut self, client: Client, request: InstallRequest) -> Result<(), SessionError> {
        if self.active.is_some() {
            return Err(SessionError::Busy);
        }
        if request.install_dir.as_os_str().is_empty() {
            return Err(SessionError::NoInstallDir);
        }

        tracing::debug!("Starting install into {}", request.install_dir.display());
        let (tx, rx) = mpsc::unbounded_channel();
        let pipeline = InstallPipeline::new(client, request, tx);
        let worker = tokio::spawn(pipeline.run());

        self.active = Some(InstallHandle { events: rx, worker });
        Ok(())
    }

    /// Next event of the running install, or `None` when idle.
    ///
    /// The handle is released once [`InstallEvent::Finished`] has been
    /// delivered. A worker that dies without finishing is reported as a
    /// failed outcome.
    pub async fn next_event(&mut self) -> Option<InstallEvent> {
        let handle = self.active.as_mut()?;
        let event = handle.events.recv().await;

        match event {
            Some(InstallEvent::Finished(outcome)) => {
                self.active = None;
                Some(InstallEvent::Finished(outcome))
            }
            Some(event) => Some(event),
            None => {
                let handle = self.active.take()?;
                let outcome = match handle.worker.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!("Install worker stopped: {}", e);
                        InstallOutcome::failed(format!("install worker stopped unexpectedly: {}", e))
                    }
                };
                Some(InstallEvent::Finished(outcome))
            }
        }
    }

    /// Drain events until the running install finishes, passing every
    /// intermediate event to `on_event`.
    pub async fn wait<F>(&mut self, mut on_event: F) -> Option<InstallOutcome>
    where
        F: FnMut(&InstallEvent),
    {
        while let Some(event) = self.next_event().await {
            if let InstallEvent::Finished(outcome) = event {
                return Some(outcome);
            }
            on_event(&event);
        }
        None
    }
}
