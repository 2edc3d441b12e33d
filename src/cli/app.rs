//! Session runner
//!
//! Wires the capture device, the monitoring output and the controller
//! together, then feeds intents from the terminal and the control socket
//! until SIGINT/SIGTERM or `quit`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::application::ports::ConfigStore;
use crate::application::{
    Outcome, SessionController, SessionError, SessionHandle, SessionResources, SessionSnapshot,
};
use crate::domain::config::AppConfig;
use crate::domain::recording::Recording;
use crate::domain::session::{Intent, Transition};
use crate::infrastructure::{CpalCapture, RecordingExporter, RodioMixer, XdgConfigStore};

use super::args::SessionOptions;
use super::pid_file::PidFile;
use super::presenter::Presenter;
use super::signals::SignalHandler;
use super::socket::{SessionSocketServer, SocketPath, STATUS_COMMAND};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

const HELP: &str = "Commands: mic, rec, stop, monitor, status, quit";

/// What to do with one terminal line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Intent(Intent),
    Status,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl TerminalCommand {
    pub fn parse(line: &str) -> Self {
        let word = line.trim().to_lowercase();
        match word.as_str() {
            "" => Self::Empty,
            STATUS_COMMAND => Self::Status,
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            other => match other.parse() {
                Ok(intent) => Self::Intent(intent),
                Err(_) => Self::Unknown(line.trim().to_string()),
            },
        }
    }
}

/// Writes every finalized recording to the output dir, in stop order
struct RecordingSaver {
    exporter: RecordingExporter,
    finished: mpsc::UnboundedReceiver<Recording>,
}

impl RecordingSaver {
    fn new(exporter: RecordingExporter, finished: mpsc::UnboundedReceiver<Recording>) -> Self {
        Self { exporter, finished }
    }

    async fn next(&mut self) -> Option<Recording> {
        self.finished.recv().await
    }

    async fn save(&self, recording: &Recording, presenter: &Presenter) -> Option<PathBuf> {
        match self.exporter.export(recording).await {
            Ok(path) => {
                presenter.recording_saved(recording, &path);
                Some(path)
            }
            Err(e) => {
                presenter.error(&format!("Failed to save recording: {}", e));
                None
            }
        }
    }

    /// Save whatever is already queued. Returns how many were written.
    async fn save_pending(&mut self, presenter: &Presenter) -> usize {
        let mut saved = 0;
        while let Ok(recording) = self.finished.try_recv() {
            if self.save(&recording, presenter).await.is_some() {
                saved += 1;
            }
        }
        saved
    }
}

/// Run the interactive recording session
pub async fn run_session(options: SessionOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let mut pid_file = PidFile::new();
    if let Err(e) = pid_file.acquire() {
        presenter.error(&e.to_string());
        return ExitCode::from(EXIT_ERROR);
    }

    let mut signals = match SignalHandler::new() {
        Ok(s) => s,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    // The one output path for the whole process
    let mixer = match RodioMixer::new() {
        Ok(mixer) => Arc::new(mixer),
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let capture = CpalCapture::new(options.input_device.clone());
    let resources = SessionResources::new(
        capture,
        mixer,
        options.format,
        options.chunk_interval.as_std(),
    );
    let mut controller = SessionController::new(resources, options.constraints);
    let Some(finished) = controller.take_finished_recordings() else {
        presenter.error("Finished recordings already claimed");
        return ExitCode::from(EXIT_ERROR);
    };
    let session = controller.handle();
    let controller_task = tokio::spawn(controller.run());

    let mut socket_server = SessionSocketServer::new(SocketPath::new());
    if let Err(e) = socket_server.bind() {
        presenter.error(&format!("Failed to bind socket: {}", e));
        let _ = session.shutdown().await;
        let _ = controller_task.await;
        return ExitCode::from(EXIT_ERROR);
    }
    let socket_display = socket_server.path().display().to_string();
    let socket_session = session.clone();
    let socket_task = tokio::spawn(async move {
        if let Err(e) = socket_server.run(socket_session).await {
            warn!(error = %e, "Control socket stopped");
        }
    });

    if options.monitor {
        report_outcome(&presenter, session.dispatch(Intent::ToggleMonitor).await);
    }

    presenter.info(&format!(
        "PID: {} | Socket: {} | Output: {}",
        std::process::id(),
        socket_display,
        options.output_dir.display()
    ));
    presenter.info(HELP);

    let mut saver = RecordingSaver::new(RecordingExporter::new(&options.output_dir), finished);
    let mut snapshots = session.subscribe();
    let _ = snapshots.borrow_and_update();

    session_loop(&session, &mut signals, &mut snapshots, &mut saver, &mut presenter).await;

    let result = match session.shutdown().await {
        Ok(()) => controller_task.await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    socket_task.abort();
    let _ = socket_task.await;
    presenter.stop_spinner();

    // Includes the recording shutdown finalized
    saver.save_pending(&presenter).await;

    let code = match result {
        Ok(_) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            presenter.error(&format!("Session ended abnormally: {}", e));
            ExitCode::from(EXIT_ERROR)
        }
    };

    let _ = pid_file.release();
    code
}

async fn session_loop(
    session: &SessionHandle,
    signals: &mut SignalHandler,
    snapshots: &mut watch::Receiver<SessionSnapshot>,
    saver: &mut RecordingSaver,
    presenter: &mut Presenter,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            signal = signals.recv() => {
                if let Some(signal) = signal {
                    presenter.stop_spinner();
                    presenter.info(&format!("Received {}, shutting down", signal.as_str()));
                }
                return;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                presenter.track(&snapshot);
            }
            Some(recording) = saver.next() => {
                saver.save(&recording, presenter).await;
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        info!("Terminal input closed, still listening on the control socket");
                        stdin_open = false;
                        continue;
                    }
                };
                match TerminalCommand::parse(&line) {
                    TerminalCommand::Intent(intent) => {
                        report_outcome(presenter, session.dispatch(intent).await);
                    }
                    TerminalCommand::Status => presenter.status(&session.snapshot()),
                    TerminalCommand::Help => presenter.info(HELP),
                    TerminalCommand::Quit => return,
                    TerminalCommand::Empty => {}
                    TerminalCommand::Unknown(word) => {
                        presenter.warn(&format!("Unknown command '{}'. {}", word, HELP));
                    }
                }
            }
        }
    }
}

fn report_outcome(presenter: &Presenter, outcome: Result<Outcome, SessionError>) {
    match outcome {
        Ok(Outcome::Applied(transition)) => {
            if let Some(message) = transition_message(transition) {
                presenter.success(message);
            }
        }
        Ok(Outcome::Ignored(reason)) => presenter.warn(&reason.to_string()),
        Err(e) => presenter.error(&e.to_string()),
    }
}

/// Terminal line for transitions the spinner does not already show
fn transition_message(transition: Transition) -> Option<&'static str> {
    match transition {
        Transition::AcquireMicrophone => Some("Microphone on"),
        Transition::ReleaseMicrophone => Some("Microphone off"),
        Transition::Mute => Some("Monitoring off"),
        Transition::Unmute => Some("Monitoring on"),
        Transition::StartRecording
        | Transition::PauseRecording
        | Transition::ResumeRecording
        | Transition::StopRecording => None,
    }
}

/// Load and merge configuration: defaults < file < cli
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    AppConfig::defaults().merge(file_config).merge(cli_config)
}
