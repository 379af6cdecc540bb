//! CLI Module
//!
//! Command-line interface for the Voicebox audio core.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::EffectSettings;
use crate::render::{AudioFormat, QualitySettings};

/// Default settings file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "data/settings.json";

/// Voicebox - voice clip post-processing and rendering
#[derive(Parser, Debug)]
#[command(name = "voicebox-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Pitch and speed flags shared by the processing commands
#[derive(Args, Debug, Clone, Copy)]
pub struct EffectArgs {
    /// Pitch shift in semitones (-12 to 12)
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pitch: f32,

    /// Speed factor (0.5 to 2.0)
    #[arg(short, long, default_value_t = 1.0)]
    pub speed: f32,
}

impl EffectArgs {
    pub fn to_settings(self) -> crate::Result<EffectSettings> {
        EffectSettings::new(self.pitch, self.speed)
    }
}

/// Per-format quality flags; only the one matching the format is used
#[derive(Args, Debug, Clone, Default)]
pub struct QualityArgs {
    /// MP3 bitrate, e.g. 192k
    #[arg(long)]
    pub bitrate: Option<String>,

    /// OGG quality (0-10)
    #[arg(long)]
    pub quality: Option<u8>,

    /// FLAC compression level (0-8)
    #[arg(long)]
    pub compression: Option<u8>,
}

impl From<QualityArgs> for QualitySettings {
    fn from(args: QualityArgs) -> Self {
        QualitySettings {
            bitrate: args.bitrate,
            quality: args.quality,
            compression: args.compression,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a short WAV preview with effects applied
    #[command(name = "preview")]
    Preview {
        /// Source audio file
        input: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,

        /// Seconds of source audio to preview (defaults to the configured length)
        #[arg(short, long)]
        duration: Option<f64>,
    },

    /// Render a whole file with effects to an output format
    #[command(name = "render")]
    Render {
        /// Source audio file
        input: PathBuf,

        /// Destination file
        output: PathBuf,

        #[command(flatten)]
        effects: EffectArgs,

        /// Output format (defaults to the output file's extension)
        #[arg(short, long, value_enum)]
        format: Option<AudioFormat>,

        #[command(flatten)]
        quality: QualityArgs,
    },

    /// Render a history entry into the project's outputs and record it
    #[command(name = "process")]
    Process {
        /// Project directory, or a project name under the projects directory
        #[arg(long)]
        project: PathBuf,

        /// History entry id
        entry_id: String,

        #[command(flatten)]
        effects: EffectArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = AudioFormat::Wav)]
        format: AudioFormat,

        #[command(flatten)]
        quality: QualityArgs,
    },

    /// Delete stale preview files
    #[command(name = "evict")]
    Evict {
        /// Maximum age in seconds (defaults to the configured age)
        #[arg(long)]
        max_age: Option<u64>,
    },

    /// Print the output filename a render would get
    #[command(name = "filename")]
    Filename {
        /// Original filename
        name: String,

        #[command(flatten)]
        effects: EffectArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = AudioFormat::Wav)]
        format: AudioFormat,
    },

    /// Extract a time range of an online video's audio as WAV
    #[command(name = "import-clip")]
    ImportClip {
        /// Video URL
        url: String,

        /// Start time, seconds or HH:MM:SS
        #[arg(long)]
        start: String,

        /// End time, seconds or HH:MM:SS
        #[arg(long)]
        end: String,

        /// Directory to write the clip into
        #[arg(short, long)]
        output_dir: PathBuf,
    },
}
