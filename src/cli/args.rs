//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::audio::CaptureConstraints;
use crate::domain::recording::{AudioFormat, Duration};
use crate::domain::session::Intent;

/// Voice Recorder - microphone recording with live monitoring
#[derive(Parser, Debug)]
#[command(name = "voice-recorder")]
#[command(version)]
#[command(about = "Record from the microphone with pause/resume and live monitoring")]
#[command(long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<FormatArg>,

    /// Directory finished recordings are written to
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Encoder chunk interval (e.g., 500ms, 1s)
    #[arg(long, value_name = "TIME")]
    pub chunk_interval: Option<String>,

    /// Input device name
    #[arg(long, value_name = "NAME", env = "VOICE_RECORDER_DEVICE")]
    pub device: Option<String>,

    /// Number of capture channels (1 or 2)
    #[arg(long, value_name = "N")]
    pub channels: Option<u16>,

    /// Start with monitoring enabled
    #[arg(short = 'm', long)]
    pub monitor: bool,

    /// Log transitions to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the recording session (default)
    Session,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Send a command to the running session
    Ctl {
        #[command(subcommand)]
        action: CtlAction,
    },
}

/// Control actions for a running session
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlAction {
    /// Turn the microphone on or off
    Mic,
    /// Start, pause or resume recording
    Record,
    /// Stop recording and export it
    Stop,
    /// Toggle live monitoring
    Monitor,
    /// Print the session status as JSON
    Status,
}

impl CtlAction {
    /// Intent carried by this action, if any
    pub fn intent(self) -> Option<Intent> {
        match self {
            CtlAction::Mic => Some(Intent::ToggleMic),
            CtlAction::Record => Some(Intent::ToggleRecord),
            CtlAction::Stop => Some(Intent::Stop),
            CtlAction::Monitor => Some(Intent::ToggleMonitor),
            CtlAction::Status => None,
        }
    }
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Format argument for clap ValueEnum
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Wav,
    Pcm,
}

impl From<FormatArg> for AudioFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Wav => AudioFormat::Wav,
            FormatArg::Pcm => AudioFormat::Pcm,
        }
    }
}

/// Parsed session options
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub format: AudioFormat,
    pub chunk_interval: Duration,
    pub output_dir: PathBuf,
    pub input_device: Option<String>,
    pub monitor: bool,
    pub constraints: CaptureConstraints,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "format",
    "chunk_interval",
    "output_dir",
    "input_device",
    "monitor",
    "constraints.auto_gain_control",
    "constraints.echo_cancellation",
    "constraints.noise_suppression",
    "constraints.channel_count",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::parse_from(["voice-recorder"]);
        assert!(cli.format.is_none());
        assert!(cli.output_dir.is_none());
        assert!(cli.chunk_interval.is_none());
        assert!(cli.channels.is_none());
        assert!(!cli.monitor);
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn cli_parses_session_options() {
        let cli = Cli::parse_from([
            "voice-recorder",
            "-f",
            "pcm",
            "-o",
            "/tmp/takes",
            "--chunk-interval",
            "250ms",
            "--channels",
            "2",
            "-m",
            "-v",
        ]);
        assert_eq!(cli.format, Some(FormatArg::Pcm));
        assert_eq!(cli.output_dir, Some("/tmp/takes".to_string()));
        assert_eq!(cli.chunk_interval, Some("250ms".to_string()));
        assert_eq!(cli.channels, Some(2));
        assert!(cli.monitor);
        assert!(cli.verbose);
    }

    #[test]
    fn cli_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["voice-recorder", "-f", "mp3"]).is_err());
    }

    #[test]
    fn cli_parses_session_subcommand() {
        let cli = Cli::parse_from(["voice-recorder", "session"]);
        assert!(matches!(cli.command, Some(Commands::Session)));
    }

    #[test]
    fn cli_parses_ctl() {
        let cli = Cli::parse_from(["voice-recorder", "ctl", "record"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Ctl {
                action: CtlAction::Record
            })
        ));
    }

    #[test]
    fn ctl_actions_map_to_intents() {
        assert_eq!(CtlAction::Mic.intent(), Some(Intent::ToggleMic));
        assert_eq!(CtlAction::Record.intent(), Some(Intent::ToggleRecord));
        assert_eq!(CtlAction::Stop.intent(), Some(Intent::Stop));
        assert_eq!(CtlAction::Monitor.intent(), Some(Intent::ToggleMonitor));
        assert_eq!(CtlAction::Status.intent(), None);
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["voice-recorder", "config", "set", "format", "pcm"]);
        if let Some(Commands::Config {
            action: ConfigAction::Set { key, value },
        }) = cli.command
        {
            assert_eq!(key, "format");
            assert_eq!(value, "pcm");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn format_arg_converts() {
        assert_eq!(AudioFormat::from(FormatArg::Wav), AudioFormat::Wav);
        assert_eq!(AudioFormat::from(FormatArg::Pcm), AudioFormat::Pcm);
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("format"));
        assert!(is_valid_config_key("constraints.channel_count"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
