//! Parsing of SR Research EyeLink [ASC files][asc].
//!
//! An ASC file is the text export of an EDF recording. Every line is one of:
//! a gaze sample, an event start or stop (`SFIX`, `ESACC`, `EBLINK`, ...), a
//! recording boundary (`START`/`END`), a configuration line, or a free-form
//! `MSG` line. [`parse_eyelink`] turns the whole file into a [`Samples`]
//! table, an [`Events`] table and a [`Metadata`] record.
//!
//! User-supplied [`PatternSpec`]s decide which `MSG` lines become additional
//! sample/event columns (e.g. trial identifiers) or extra metadata entries.
//!
//! [asc]: http://download.sr-support.com/dispdoc/page25.html
#![forbid(unsafe_code)]

use thiserror::Error;

mod ascparser;
mod metadata;
mod patterns;
mod records;

pub use ascparser::{parse_eyelink, parse_eyelink_reader, parse_eyelink_str, ParseOptions};
pub use metadata::{parse_eyelink_version, Metadata, MountConfiguration, ParseWarning};
pub use patterns::{
    compile_patterns, pattern_keys, CompiledPattern, PatternField, PatternMapping, PatternSource,
    PatternSpec, MESSAGE_PREFIX,
};
pub use records::{
    classify, Calibration, Eye, EventKind, Record, RecordKind, RecordingConfig, SampleRow,
    SamplesConfig, Validation, CLASSIFICATION_ORDER,
};

pub use gazeframe::{Events, EyeLayout, Samples};

#[derive(Error, Debug)]
pub enum AscParserError {
    #[error("Cannot parse record from: {0}")]
    UnrecognizedString(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error("Unknown encoding `{0}`.")]
    UnknownEncoding(String),
    #[error("Input is not valid {0}.")]
    Decode(&'static str),
    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),
    #[error(transparent)]
    ParseFloatError(#[from] std::num::ParseFloatError),
    #[error(transparent)]
    Frame(#[from] gazeframe::FrameError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
