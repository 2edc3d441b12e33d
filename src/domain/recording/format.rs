//! Output format value object

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidFormatError;

/// Container/codec produced by the encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioFormat {
    /// RIFF/WAVE with 16-bit little-endian PCM
    #[default]
    Wav,
    /// Headerless 16-bit little-endian PCM
    Pcm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 2] = [AudioFormat::Wav, AudioFormat::Pcm];

    /// Get the config/CLI name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    /// Get the MIME type string
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/L16",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    /// Filename offered for a finished recording
    pub fn suggested_filename(&self) -> String {
        format!("recording.{}", self.extension())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = InvalidFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wav" | "wave" => Ok(Self::Wav),
            "pcm" | "raw" => Ok(Self::Pcm),
            _ => Err(InvalidFormatError {
                input: s.to_string(),
            }),
        }
    }
}
