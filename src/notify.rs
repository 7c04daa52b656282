//! Downstream notifications via Unix socket
//!
//! After every successful pass the service pushes events to whoever is
//! listening (a status indicator, an automation bridge). Uses
//! length-prefixed JSON over a Unix domain socket; delivery is
//! best-effort, and no listener bound is the normal case, never an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants;

/// Maximum event size; anything larger is a corrupt stream
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Events pushed after a pass completes
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ProfileEvent {
    /// The set of saved profiles changed, or their active flags did
    ListChanged,

    /// The applied state changed; `active` names the profile now in
    /// effect, if any
    StateChanged { active: Option<String> },
}

/// Get default socket path (XDG_RUNTIME_DIR with fallback to cache)
pub fn default_socket_path() -> Result<PathBuf> {
    let socket = format!("{}/events.sock", constants::config::APP_DIR);
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return Ok(PathBuf::from(runtime_dir).join(socket));
    }
    let cache = dirs::cache_dir()
        .context("Failed to determine cache directory (no XDG_RUNTIME_DIR or HOME)")?;
    Ok(cache.join(socket))
}

fn write_message<T: Serialize>(stream: &mut UnixStream, message: &T) -> Result<()> {
    let payload = serde_json::to_vec(message).context("Failed to serialize event")?;
    let len = (payload.len() as u32).to_be_bytes();
    stream.write_all(&len)?;
    stream.write_all(&payload)?;
    stream.flush()?;
    Ok(())
}

fn read_message<T: for<'de> Deserialize<'de>>(stream: &mut UnixStream) -> Result<T> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        anyhow::bail!("event of {len} bytes exceeds maximum");
    }
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload)?;
    serde_json::from_slice(&payload).context("Failed to parse event")
}

pub trait Notifier {
    /// Push an event downstream. Best-effort: failures are logged, never
    /// propagated into the pass result.
    fn notify(&mut self, event: &ProfileEvent);
}

/// Pushes events to the well-known socket if a listener is bound there
pub struct SocketNotifier {
    path: PathBuf,
}

impl SocketNotifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_socket_path()?,
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Notifier for SocketNotifier {
    fn notify(&mut self, event: &ProfileEvent) {
        match UnixStream::connect(&self.path) {
            Ok(mut stream) => {
                if let Err(e) = write_message(&mut stream, event) {
                    debug!(error = %e, "failed to push event");
                }
            }
            // No listener bound; nothing to do
            Err(e) => debug!(error = %e, "no event listener"),
        }
    }
}

/// Listener side, used by `profilectl watch` and external indicators
pub struct EventListener {
    listener: UnixListener,
    socket_path: PathBuf,
}

impl EventListener {
    pub fn bind_default() -> Result<Self> {
        Self::bind(default_socket_path()?)
    }

    pub fn bind(socket_path: PathBuf) -> Result<Self> {
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        // Stale socket from a previous listener
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)
                .with_context(|| format!("Failed to remove stale socket {}", socket_path.display()))?;
        }
        let listener = UnixListener::bind(&socket_path)
            .with_context(|| format!("Failed to bind {}", socket_path.display()))?;
        Ok(Self {
            listener,
            socket_path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Block until the next event arrives
    pub fn next_event(&self) -> Result<ProfileEvent> {
        let (mut stream, _) = self.listener.accept().context("accept failed")?;
        read_message(&mut stream)
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_round_trip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.sock");
        let listener = EventListener::bind(path.clone()).unwrap();
        let mut notifier = SocketNotifier::with_path(path);

        notifier.notify(&ProfileEvent::StateChanged {
            active: Some("desk".into()),
        });
        let event = listener.next_event().unwrap();
        assert_eq!(
            event,
            ProfileEvent::StateChanged {
                active: Some("desk".into())
            }
        );
    }

    #[test]
    fn test_notify_without_listener_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let mut notifier = SocketNotifier::with_path(dir.path().join("missing.sock"));
        // Must not panic or error
        notifier.notify(&ProfileEvent::ListChanged);
    }
}
