//! TOML settings for the `gazemove` binary.
//!
//! ```toml
//! sampling_rate = 1000.0
//!
//! [parse]
//! encoding = "latin1"
//! trial_columns = ["trial"]
//! patterns = [
//!     { pattern = "START_TRIAL_(?P<trial>\\d+)", column = "trial" },
//!     { pattern = "STOP_TRIAL", column = "trial", reset = true },
//! ]
//! metadata_patterns = ["subject: (?P<subject>\\w+)"]
//!
//! [parse.schema]
//! trial = "int"
//!
//! [[detect]]
//! method = "microsaccades"
//! threshold = "engbert2015"
//!
//! [[detect]]
//! method = "fill"
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use eyelink_asc::{AscParserError, ParseOptions, PatternSpec};
use gazeframe::DataType;
use serde::Deserialize;
use thiserror::Error;

use crate::detection::DetectionMethod;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    TomlError(#[from] toml::de::Error),
    #[error(transparent)]
    Pattern(#[from] AscParserError),
}

/// How to read the ASC file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ParseSettings {
    pub encoding: Option<String>,
    /// Sample columns identifying a trial.
    pub trial_columns: Vec<String>,
    pub patterns: Vec<toml::Value>,
    pub metadata_patterns: Vec<toml::Value>,
    pub schema: BTreeMap<String, DataType>,
}

impl ParseSettings {
    /// Convert to parser options, validating every pattern spec.
    pub fn to_options(&self) -> Result<ParseOptions, ConfigError> {
        let specs = |values: &[toml::Value]| {
            values
                .iter()
                .map(PatternSpec::try_from)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(ParseOptions {
            encoding: self.encoding.clone(),
            patterns: specs(&self.patterns)?,
            metadata_patterns: specs(&self.metadata_patterns)?,
            schema: self.schema.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub parse: ParseSettings,
    /// Overrides the sampling rate found in the file.
    pub sampling_rate: Option<f64>,
    /// Detection passes, run in order.
    pub detect: Vec<DetectionMethod>,
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
        fs::read_to_string(path)?.parse()
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Settings, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}
