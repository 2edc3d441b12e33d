//! Unix domain socket for controlling a running session
//!
//! One command per connection. The reply is a single line:
//! `ok: <transition>`, `ignored: <reason>`, `error: <message>`, or the
//! status snapshot as JSON.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, warn};

use crate::application::{Outcome, SessionHandle, SessionSnapshot};
use crate::domain::session::Intent;

const SOCKET_NAME: &str = "voice-recorder.sock";

/// Command that asks for the status report
pub const STATUS_COMMAND: &str = "status";

/// Socket path resolver
#[derive(Debug, Clone)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Create socket path, preferring XDG_RUNTIME_DIR over the temp dir
    pub fn new() -> Self {
        Self {
            path: runtime_dir().join(SOCKET_NAME),
        }
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if socket file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-user runtime directory for the socket and PID file
pub fn runtime_dir() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Session status as reported over the socket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: String,
    pub microphone_on: bool,
    pub monitoring: bool,
    pub elapsed_seconds: u64,
    pub elapsed: String,
    pub completed_recordings: u64,
    pub last_recording: Option<RecordingReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingReport {
    pub mime_type: String,
    pub bytes: usize,
}

impl From<&SessionSnapshot> for StatusReport {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            state: snapshot.recording_state.to_string(),
            microphone_on: snapshot.microphone_on,
            monitoring: snapshot.monitoring,
            elapsed_seconds: snapshot.elapsed_seconds,
            elapsed: snapshot.elapsed().to_string(),
            completed_recordings: snapshot.completed_recordings,
            last_recording: snapshot.last_recording.as_ref().map(|r| RecordingReport {
                mime_type: r.mime_type().to_string(),
                bytes: r.size_bytes(),
            }),
        }
    }
}

/// Socket server that forwards commands to the session
pub struct SessionSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl SessionSocketServer {
    /// Create a new socket server
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    /// Bind to the socket, replacing a stale socket file
    pub fn bind(&mut self) -> io::Result<()> {
        self.socket_path.cleanup()?;
        self.listener = Some(UnixListener::bind(self.socket_path.path())?);
        Ok(())
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        self.socket_path.path()
    }

    /// Accept connections until the task is dropped
    pub async fn run(&self, session: SessionHandle) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let session = session.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &session).await {
                            warn!(error = %e, "Socket connection error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Socket accept error"),
            }
        }
    }

    /// Cleanup socket file
    pub fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

impl Drop for SessionSocketServer {
    fn drop(&mut self) {
        if self.listener.is_some() {
            self.cleanup();
        }
    }
}

async fn handle_connection(stream: UnixStream, session: &SessionHandle) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader.read_line(&mut line).await?;
    let response = respond(session, line.trim()).await;
    debug!(command = line.trim(), response = %response, "Socket command");

    writer.write_all(format!("{}\n", response).as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

/// Reply line for one command
pub async fn respond(session: &SessionHandle, command: &str) -> String {
    if command == STATUS_COMMAND {
        let report = StatusReport::from(&session.snapshot());
        return serde_json::to_string(&report)
            .unwrap_or_else(|e| format!("error: {}", e));
    }

    let intent: Intent = match command.parse() {
        Ok(intent) => intent,
        Err(e) => return format!("error: {}", e),
    };

    match session.dispatch(intent).await {
        Ok(Outcome::Applied(transition)) => format!("ok: {}", transition),
        Ok(Outcome::Ignored(reason)) => format!("ignored: {}", reason),
        Err(e) => format!("error: {}", e),
    }
}

/// Socket client used by `ctl`
pub struct SessionSocketClient {
    socket_path: SocketPath,
}

impl SessionSocketClient {
    /// Create a new socket client
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }

    /// Check if a session appears to be running (socket exists)
    pub fn is_session_running(&self) -> bool {
        self.socket_path.exists()
    }

    /// Send a command and receive response
    pub async fn send_command(&self, cmd: &str) -> io::Result<String> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, mut writer) = stream.into_split();

        writer.write_all(format!("{}\n", cmd).as_bytes()).await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        reader.read_line(&mut response).await?;

        Ok(response)
    }
}
