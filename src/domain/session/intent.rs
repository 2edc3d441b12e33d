//! User intents accepted by the session

use std::fmt;
use std::str::FromStr;

use crate::domain::error::UnknownIntentError;

/// An action the user asks the session to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    /// Turn the microphone on, or off when it is already on
    ToggleMic,
    /// Start, pause or resume recording depending on the current state
    ToggleRecord,
    /// Finalize the running recording
    Stop,
    /// Make the live microphone signal audible, or mute it
    ToggleMonitor,
}

impl Intent {
    /// All intents, in display order
    pub const ALL: [Intent; 4] = [
        Intent::ToggleMic,
        Intent::ToggleRecord,
        Intent::Stop,
        Intent::ToggleMonitor,
    ];

    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ToggleMic => "toggle mic",
            Self::ToggleRecord => "toggle record",
            Self::Stop => "stop",
            Self::ToggleMonitor => "toggle monitor",
        }
    }

    /// Short command word used by the terminal and the control socket
    pub const fn command(&self) -> &'static str {
        match self {
            Self::ToggleMic => "mic",
            Self::ToggleRecord => "record",
            Self::Stop => "stop",
            Self::ToggleMonitor => "monitor",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Intent {
    type Err = UnknownIntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mic" | "m" => Ok(Self::ToggleMic),
            "record" | "rec" | "r" | "pause" | "resume" => Ok(Self::ToggleRecord),
            "stop" | "s" => Ok(Self::Stop),
            "monitor" | "mon" => Ok(Self::ToggleMonitor),
            _ => Err(UnknownIntentError {
                input: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_words() {
        assert_eq!("mic".parse::<Intent>().unwrap(), Intent::ToggleMic);
        assert_eq!("rec".parse::<Intent>().unwrap(), Intent::ToggleRecord);
        assert_eq!("pause".parse::<Intent>().unwrap(), Intent::ToggleRecord);
        assert_eq!(" STOP ".parse::<Intent>().unwrap(), Intent::Stop);
        assert_eq!("monitor".parse::<Intent>().unwrap(), Intent::ToggleMonitor);
    }

    #[test]
    fn parse_unknown_command_fails() {
        let err = "louder".parse::<Intent>().unwrap_err();
        assert_eq!(err.input, "louder");
        assert!(err.to_string().contains("louder"));
    }

    #[test]
    fn command_words_parse_back() {
        for intent in Intent::ALL {
            assert_eq!(intent.command().parse::<Intent>().unwrap(), intent);
        }
    }
}
