//! Output formats and per-format quality settings
//!
//! `QualitySettings` is the loose request form with one optional field per
//! format. `EncodeProfile` is what the encoder actually consumes: one variant
//! per format carrying only the parameter that format understands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VoiceboxError};

/// Default MP3 bitrate
pub const DEFAULT_MP3_BITRATE: &str = "192k";

/// Default Vorbis quality (0-10)
pub const DEFAULT_OGG_QUALITY: u8 = 5;

/// Default FLAC compression level (0-8)
pub const DEFAULT_FLAC_COMPRESSION: u8 = 5;

const MAX_OGG_QUALITY: u8 = 10;
const MAX_FLAC_COMPRESSION: u8 = 8;

/// Target audio container for a full render
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Ogg,
    Flac,
}

impl AudioFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = VoiceboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" => Ok(AudioFormat::Wav),
            "mp3" => Ok(AudioFormat::Mp3),
            "ogg" => Ok(AudioFormat::Ogg),
            "flac" => Ok(AudioFormat::Flac),
            other => Err(VoiceboxError::InvalidParameter {
                name: "format",
                reason: format!("unsupported output format '{}' (wav, mp3, ogg, flac)", other),
            }),
        }
    }
}

/// Optional encode parameters as submitted by a client
///
/// Only the field matching the chosen format is consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    /// MP3 bitrate, e.g. "192k" or "320k"
    pub bitrate: Option<String>,
    /// Vorbis quality 0-10
    pub quality: Option<u8>,
    /// FLAC compression level 0-8
    pub compression: Option<u8>,
}

/// Validated encode parameters, one variant per format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum EncodeProfile {
    Wav,
    Mp3 { bitrate: String },
    Ogg { quality: u8 },
    Flac { compression: u8 },
}

impl EncodeProfile {
    /// Resolve the request form into a profile, applying per-format defaults
    ///
    /// # Errors
    /// * `InvalidParameter` - If the field relevant to `format` is out of range
    pub fn resolve(format: AudioFormat, settings: &QualitySettings) -> Result<Self> {
        match format {
            AudioFormat::Wav => Ok(EncodeProfile::Wav),
            AudioFormat::Mp3 => {
                let bitrate = settings
                    .bitrate
                    .clone()
                    .unwrap_or_else(|| DEFAULT_MP3_BITRATE.to_string());
                validate_bitrate(&bitrate)?;
                Ok(EncodeProfile::Mp3 { bitrate })
            }
            AudioFormat::Ogg => {
                let quality = settings.quality.unwrap_or(DEFAULT_OGG_QUALITY);
                if quality > MAX_OGG_QUALITY {
                    return Err(VoiceboxError::InvalidParameter {
                        name: "quality",
                        reason: format!("OGG quality must be 0-{}, got {}", MAX_OGG_QUALITY, quality),
                    });
                }
                Ok(EncodeProfile::Ogg { quality })
            }
            AudioFormat::Flac => {
                let compression = settings.compression.unwrap_or(DEFAULT_FLAC_COMPRESSION);
                if compression > MAX_FLAC_COMPRESSION {
                    return Err(VoiceboxError::InvalidParameter {
                        name: "compression",
                        reason: format!(
                            "FLAC compression must be 0-{}, got {}",
                            MAX_FLAC_COMPRESSION, compression
                        ),
                    });
                }
                Ok(EncodeProfile::Flac { compression })
            }
        }
    }

    /// Profile for a format with all defaults
    pub fn default_for(format: AudioFormat) -> Self {
        match format {
            AudioFormat::Wav => EncodeProfile::Wav,
            AudioFormat::Mp3 => EncodeProfile::Mp3 {
                bitrate: DEFAULT_MP3_BITRATE.to_string(),
            },
            AudioFormat::Ogg => EncodeProfile::Ogg {
                quality: DEFAULT_OGG_QUALITY,
            },
            AudioFormat::Flac => EncodeProfile::Flac {
                compression: DEFAULT_FLAC_COMPRESSION,
            },
        }
    }

    pub fn format(&self) -> AudioFormat {
        match self {
            EncodeProfile::Wav => AudioFormat::Wav,
            EncodeProfile::Mp3 { .. } => AudioFormat::Mp3,
            EncodeProfile::Ogg { .. } => AudioFormat::Ogg,
            EncodeProfile::Flac { .. } => AudioFormat::Flac,
        }
    }
}

/// Bitrates look like "<kbps>k", e.g. "128k"
fn validate_bitrate(bitrate: &str) -> Result<()> {
    let valid = bitrate
        .strip_suffix('k')
        .and_then(|kbps| kbps.parse::<u32>().ok())
        .map(|kbps| kbps > 0)
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(VoiceboxError::InvalidParameter {
            name: "bitrate",
            reason: format!("MP3 bitrate must look like '192k', got '{}'", bitrate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_per_format() {
        let empty = QualitySettings::default();
        assert_eq!(
            EncodeProfile::resolve(AudioFormat::Mp3, &empty).unwrap(),
            EncodeProfile::Mp3 {
                bitrate: "192k".to_string()
            }
        );
        assert_eq!(
            EncodeProfile::resolve(AudioFormat::Ogg, &empty).unwrap(),
            EncodeProfile::Ogg { quality: 5 }
        );
        assert_eq!(
            EncodeProfile::resolve(AudioFormat::Flac, &empty).unwrap(),
            EncodeProfile::Flac { compression: 5 }
        );
        assert_eq!(
            EncodeProfile::resolve(AudioFormat::Wav, &empty).unwrap(),
            EncodeProfile::Wav
        );
    }

    #[test]
    fn test_only_matching_field_is_consulted() {
        let settings = QualitySettings {
            bitrate: Some("not a bitrate".to_string()),
            quality: Some(99),
            compression: Some(3),
        };
        assert_eq!(
            EncodeProfile::resolve(AudioFormat::Flac, &settings).unwrap(),
            EncodeProfile::Flac { compression: 3 }
        );
        assert_eq!(
            EncodeProfile::resolve(AudioFormat::Wav, &settings).unwrap(),
            EncodeProfile::Wav
        );
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let ogg = QualitySettings {
            quality: Some(11),
            ..Default::default()
        };
        assert!(EncodeProfile::resolve(AudioFormat::Ogg, &ogg).is_err());

        let flac = QualitySettings {
            compression: Some(9),
            ..Default::default()
        };
        assert!(EncodeProfile::resolve(AudioFormat::Flac, &flac).is_err());

        let mp3 = QualitySettings {
            bitrate: Some("fast".to_string()),
            ..Default::default()
        };
        let err = EncodeProfile::resolve(AudioFormat::Mp3, &mp3).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("MP3".parse::<AudioFormat>().unwrap(), AudioFormat::Mp3);
        assert_eq!(AudioFormat::Flac.to_string(), "flac");
        assert!("aiff".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn test_quality_settings_from_partial_json() {
        let settings: QualitySettings = serde_json::from_str(r#"{"bitrate": "320k"}"#).unwrap();
        assert_eq!(settings.bitrate.as_deref(), Some("320k"));
        assert_eq!(settings.quality, None);

        let format: AudioFormat = serde_json::from_str(r#""ogg""#).unwrap();
        assert_eq!(format, AudioFormat::Ogg);
    }
}
