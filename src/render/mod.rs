//! Format Rendering
//!
//! Output formats, quality profiles, the format encoder and output naming.

pub mod encoder;
pub mod filename;
pub mod format;

pub use encoder::{EncodeRequest, FormatEncoder};
pub use filename::derive_output_filename;
pub use format::{AudioFormat, EncodeProfile, QualitySettings};
