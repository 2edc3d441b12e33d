//! CLI presenter for output formatting

use std::path::Path;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::application::SessionSnapshot;
use crate::domain::recording::{Elapsed, Recording};
use crate::domain::session::RecordingState;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.red} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update spinner message
    pub fn update_spinner(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.spinner.is_some()
    }

    /// Follow a snapshot: spin while recording, hold the line while paused
    pub fn track(&mut self, snapshot: &SessionSnapshot) {
        match snapshot.recording_state {
            RecordingState::Recording => {
                let message = self.format_recording(snapshot.elapsed());
                if self.is_spinning() {
                    self.update_spinner(&message);
                } else {
                    self.start_spinner(&message);
                }
            }
            RecordingState::Paused => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.finish_with_message(self.format_paused(snapshot.elapsed()));
                }
            }
            RecordingState::Stopped => self.stop_spinner(),
        }
    }

    fn format_recording(&self, elapsed: Elapsed) -> String {
        format!("Recording {}", elapsed.to_string().bold())
    }

    fn format_paused(&self, elapsed: Elapsed) -> String {
        format!("{} Paused at {}", "❚❚".yellow(), elapsed)
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        self.println_stderr(format!("{} {}", "ℹ".cyan(), message));
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        self.println_stderr(format!("{} {}", "✓".green(), message));
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        self.println_stderr(format!("{} {}", "⚠".yellow(), message));
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        self.println_stderr(format!("{} {}", "✗".red(), message));
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }

    /// Report an exported recording
    pub fn recording_saved(&self, recording: &Recording, path: &Path) {
        self.success(&format!(
            "Saved {} ({})",
            path.display(),
            recording.human_readable_size()
        ));
    }

    /// One-line session status
    pub fn format_status(&self, snapshot: &SessionSnapshot) -> String {
        let state = match snapshot.recording_state {
            RecordingState::Stopped => "stopped".normal(),
            RecordingState::Recording => "recording".red().bold(),
            RecordingState::Paused => "paused".yellow(),
        };
        format!(
            "{} {} | mic {} | monitor {} | {}",
            "●".cyan(),
            state,
            on_off(snapshot.microphone_on),
            on_off(snapshot.monitoring),
            snapshot.elapsed()
        )
    }

    pub fn status(&self, snapshot: &SessionSnapshot) {
        self.println_stderr(self.format_status(snapshot));
    }

    /// Print without tearing the spinner line
    fn println_stderr(&self, line: String) {
        match self.spinner {
            Some(ref spinner) => spinner.suspend(|| eprintln!("{}", line)),
            None => eprintln!("{}", line),
        }
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() {
        colored::control::set_override(false);
    }

    #[test]
    fn format_status_idle() {
        plain();
        let presenter = Presenter::new();
        let status = presenter.format_status(&SessionSnapshot::default());
        assert!(status.contains("stopped"));
        assert!(status.contains("mic off"));
        assert!(status.contains("monitor off"));
        assert!(status.ends_with("00:00"));
    }

    #[test]
    fn format_status_recording() {
        plain();
        let presenter = Presenter::new();
        let snapshot = SessionSnapshot {
            recording_state: RecordingState::Recording,
            microphone_on: true,
            monitoring: true,
            elapsed_seconds: 75,
            ..Default::default()
        };
        let status = presenter.format_status(&snapshot);
        assert!(status.contains("recording"));
        assert!(status.contains("mic on"));
        assert!(status.contains("monitor on"));
        assert!(status.ends_with("01:15"));
    }

    #[test]
    fn format_recording_shows_elapsed() {
        plain();
        let presenter = Presenter::new();
        assert_eq!(presenter.format_recording(Elapsed(3)), "Recording 00:03");
        assert!(presenter.format_paused(Elapsed(62)).ends_with("Paused at 01:02"));
    }

    #[test]
    fn track_stops_spinner_when_stopped() {
        let mut presenter = Presenter::new();
        presenter.track(&SessionSnapshot {
            recording_state: RecordingState::Recording,
            microphone_on: true,
            ..Default::default()
        });
        assert!(presenter.is_spinning());

        presenter.track(&SessionSnapshot {
            recording_state: RecordingState::Stopped,
            microphone_on: true,
            ..Default::default()
        });
        assert!(!presenter.is_spinning());
    }
}
