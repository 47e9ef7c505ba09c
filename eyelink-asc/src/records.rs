//! Classification of single ASC lines into typed records.
//!
//! Record kinds are tried in the fixed order of [`CLASSIFICATION_ORDER`]; the
//! first kind whose regex matches wins. Lines matching no kind are left to the
//! metadata patterns.

use std::str::FromStr;

use gazeframe::EyeLayout;
use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::AscParserError;

// The `unwrap`s below only fire on malformed literal regexes.
lazy_static! {
    static ref MONOCULAR_SAMPLE: Regex = Regex::new(
        r"(?x)
        ^(?P<time>\d+[.]?\d*)\s+
        (?P<x_pix>[-]?\d*[.]\d*|\.)\s*
        (?P<y_pix>[-]?\d*[.]\d*|\.)\s*
        (?P<pupil>\d*[.]\d*|\.)\s*
        (?:(?P<dummy>\d*[.]\d*|\.)\s*)?
        (?P<flags>[A-Za-z.]{3,5})?
        "
    )
    .unwrap();
    static ref BINOCULAR_SAMPLE: Regex = Regex::new(
        r"(?x)
        ^(?P<time>\d+[.]?\d*)\s+
        (?P<x_left_pix>[-]?\d*[.]\d*|\.)\s*
        (?P<y_left_pix>[-]?\d*[.]\d*|\.)\s*
        (?P<pupil_left>\d*[.]\d*|\.)\s*
        (?P<x_right_pix>[-]?\d*[.]\d*|\.)\s*
        (?P<y_right_pix>[-]?\d*[.]\d*|\.)\s*
        (?P<pupil_right>\d*[.]\d*|\.)\s*
        (?:(?P<dummy>\d*[.]\d*|\.)\s*)?
        (?P<flags>[A-Za-z.]{5})?
        "
    )
    .unwrap();
    static ref EVENT_START: Regex =
        Regex::new(r"^(?P<kind>SFIX|SSACC|SBLINK)\s+(?P<eye>R|L)\s+(?P<timestamp>\d+[.]?\d*)")
            .unwrap();
    static ref EVENT_STOP: Regex = Regex::new(
        r"^(?P<kind>EFIX|ESACC|EBLINK)\s+(?P<eye>R|L)\s+(?P<onset>\d+[.]?\d*)\s+(?P<offset>\d+[.]?\d*)\s+(?P<duration>\d+[.]?\d*)"
    )
    .unwrap();
    static ref RECORDING_CONFIG: Regex = Regex::new(
        r"^MSG\s+(?P<timestamp>\d+[.]?\d*)\s+RECCFG\s+(?P<tracking_mode>[A-Z,a-z]+)\s+(?P<sampling_rate>\d+)\s+(?P<file_sample_filter>0|1|2)\s+(?P<link_sample_filter>0|1|2)\s+(?P<tracked_eye>LR|[LR])"
    )
    .unwrap();
    static ref GAZE_COORDS: Regex =
        Regex::new(r"^MSG\s+\d+[.]?\d*\s+GAZE_COORDS\s*=?\s*(?P<resolution>.*)").unwrap();
    static ref RECORDING_START: Regex =
        Regex::new(r"^START\s+(?P<timestamp>\d+[.]?\d*)\s+(RIGHT|LEFT)\s+(?P<types>.*)").unwrap();
    static ref RECORDING_STOP: Regex = Regex::new(
        r"^END\s+(?P<timestamp>\d+[.]?\d*)\s+(?P<types>.*)\s+RES\s+(?P<xres>[\d\.]*)\s+(?P<yres>[\d\.]*)"
    )
    .unwrap();
    static ref CALIBRATION_TIMESTAMP: Regex =
        Regex::new(r"^MSG\s+(?P<timestamp>\d+[.]?\d*)\s+!CAL\s*$").unwrap();
    static ref CALIBRATION: Regex = Regex::new(
        r"^>+\s+CALIBRATION\s+\(HV(?P<num_points>\d\d?),(?P<type>.*)\).*(?P<tracked_eye>RIGHT|LEFT):\s+<{9}"
    )
    .unwrap();
    static ref VALIDATION: Regex = Regex::new(
        r"^MSG\s+(?P<timestamp>\d+[.]?\d*)\s+!CAL\s+VALIDATION\s+HV(?P<num_points>\d\d?).*(?P<tracked_eye>LEFT|RIGHT)\s+(?P<error>\D*)\s+(?P<validation_score_avg>\d.\d\d)\s+avg\.\s+(?P<validation_score_max>\d.\d\d)\s+max"
    )
    .unwrap();
    static ref SAMPLES_CONFIG: Regex = Regex::new(
        r"(?ix)
        ^\s*SAMPLES\s+GAZE\s+
        (?P<tracked_eye>LEFT\s+RIGHT|L\s+R\b|LEFT|RIGHT|LR\b|[LR]\b)
        (?:\s+RATE\s+(?P<sampling_rate>\d+(?:\.\d+)?))?
        (?:\s+TRACKING\s+(?P<tracking_method>\S+))?
        (?:\s+FILTER\s+(?P<filter>\d+))?
        (?:\s+(?P<input>INPUT))?
        "
    )
    .unwrap();
}

/// A missing group or a lone `.` is a missing value.
fn check_nan(field: Option<regex::Match<'_>>) -> f64 {
    match field.map(|m| m.as_str()) {
        None | Some(".") => f64::NAN,
        Some(s) => s.parse().unwrap_or(f64::NAN),
    }
}

fn timestamp(caps: &Captures<'_>, name: &str) -> Option<f64> {
    caps.name(name)?.as_str().parse().ok()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Fixation,
    Saccade,
    Blink,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Fixation => "fixation",
            EventKind::Saccade => "saccade",
            EventKind::Blink => "blink",
        }
    }

    /// Name of the event as stored in the events table.
    pub fn event_name(self) -> String {
        format!("{}_eyelink", self.as_str())
    }

    fn from_keyword(keyword: &str) -> Option<EventKind> {
        match &keyword[1..] {
            "FIX" => Some(EventKind::Fixation),
            "SACC" => Some(EventKind::Saccade),
            "BLINK" => Some(EventKind::Blink),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    pub fn as_str(self) -> &'static str {
        match self {
            Eye::Left => "left",
            Eye::Right => "right",
        }
    }

    fn from_letter(letter: &str) -> Option<Eye> {
        match letter {
            "L" => Some(Eye::Left),
            "R" => Some(Eye::Right),
            _ => None,
        }
    }
}

/// One gaze sample line. `values` holds one entry per channel of the layout;
/// missing values are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub time: f64,
    pub values: Vec<f64>,
}

impl SampleRow {
    pub fn parse(line: &str, layout: EyeLayout) -> Result<SampleRow, AscParserError> {
        let re: &Regex = match layout {
            EyeLayout::Monocular => &MONOCULAR_SAMPLE,
            EyeLayout::Binocular => &BINOCULAR_SAMPLE,
        };
        let caps = match re.captures(line) {
            None => return Err(AscParserError::UnrecognizedString(line.to_string())),
            Some(caps) => caps,
        };

        Ok(SampleRow {
            time: caps["time"].parse()?,
            values: layout
                .channels()
                .iter()
                .map(|channel| check_nan(caps.name(channel)))
                .collect(),
        })
    }

    /// A sample is valid if none of its layout fields is missing.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| !v.is_nan())
    }
}

/// A `MSG ... RECCFG` line, optionally followed by its `GAZE_COORDS` line.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingConfig {
    pub timestamp: f64,
    pub tracking_mode: String,
    pub sampling_rate: f64,
    pub file_sample_filter: u8,
    pub link_sample_filter: u8,
    pub tracked_eye: String,
    pub resolution: Option<(f64, f64)>,
}

impl RecordingConfig {
    fn from_captures(caps: &Captures<'_>) -> Option<RecordingConfig> {
        Some(RecordingConfig {
            timestamp: timestamp(caps, "timestamp")?,
            tracking_mode: caps["tracking_mode"].to_string(),
            sampling_rate: caps["sampling_rate"].parse().ok()?,
            file_sample_filter: caps["file_sample_filter"].parse().ok()?,
            link_sample_filter: caps["link_sample_filter"].parse().ok()?,
            tracked_eye: caps["tracked_eye"].to_string(),
            resolution: None,
        })
    }

    /// Milliseconds between two samples.
    pub fn sample_period(&self) -> f64 {
        1000.0 / self.sampling_rate
    }
}

/// A calibration, possibly only its timestamp if the summary line after the
/// `!CAL` message could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub timestamp: f64,
    pub num_points: Option<u32>,
    pub calibration_type: Option<String>,
    pub tracked_eye: Option<String>,
}

impl Calibration {
    /// Read the summary on the line following a `!CAL` message.
    pub fn from_summary(timestamp: f64, line: &str) -> Calibration {
        match CALIBRATION.captures(line) {
            Some(caps) => Calibration {
                timestamp,
                num_points: caps["num_points"].parse().ok(),
                calibration_type: Some(caps["type"].to_string()),
                tracked_eye: Some(caps["tracked_eye"].to_string()),
            },
            None => Calibration {
                timestamp,
                num_points: None,
                calibration_type: None,
                tracked_eye: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub timestamp: f64,
    pub num_points: u32,
    pub tracked_eye: String,
    pub error: String,
    pub validation_score_avg: f64,
    pub validation_score_max: f64,
}

impl Validation {
    fn from_captures(caps: &Captures<'_>) -> Option<Validation> {
        Some(Validation {
            timestamp: timestamp(caps, "timestamp")?,
            num_points: caps["num_points"].parse().ok()?,
            tracked_eye: caps["tracked_eye"].to_string(),
            error: caps["error"].trim().to_string(),
            validation_score_avg: caps["validation_score_avg"].parse().ok()?,
            validation_score_max: caps["validation_score_max"].parse().ok()?,
        })
    }
}

/// A `SAMPLES GAZE ...` configuration line.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplesConfig {
    /// `L`, `R` or `LR`.
    pub tracked_eye: String,
    pub sampling_rate: Option<f64>,
    pub tracking_method: Option<String>,
    pub filter: Option<u32>,
    pub input: bool,
}

impl SamplesConfig {
    pub fn is_binocular(&self) -> bool {
        self.tracked_eye == "LR"
    }
}

impl FromStr for SamplesConfig {
    type Err = AscParserError;

    fn from_str(s: &str) -> Result<SamplesConfig, AscParserError> {
        let caps = match SAMPLES_CONFIG.captures(s) {
            None => return Err(AscParserError::UnrecognizedString(s.to_string())),
            Some(caps) => caps,
        };

        let eye: String = caps["tracked_eye"]
            .to_ascii_uppercase()
            .split_whitespace()
            .collect();
        let tracked_eye = match eye.as_str() {
            "LEFTRIGHT" | "LR" => "LR",
            "LEFT" | "L" => "L",
            _ => "R",
        };

        Ok(SamplesConfig {
            tracked_eye: tracked_eye.to_string(),
            sampling_rate: match caps.name("sampling_rate") {
                Some(m) => Some(m.as_str().parse()?),
                None => None,
            },
            tracking_method: caps.name("tracking_method").map(|m| m.as_str().to_string()),
            filter: match caps.name("filter") {
                Some(m) => Some(m.as_str().parse()?),
                None => None,
            },
            input: caps.name("input").is_some(),
        })
    }
}

/// A classified ASC line.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    EventStart {
        kind: EventKind,
        eye: Eye,
        timestamp: f64,
    },
    EventStop {
        kind: EventKind,
        eye: Eye,
        onset: f64,
        offset: f64,
    },
    RecordingConfig(RecordingConfig),
    GazeCoords {
        width: f64,
        height: f64,
    },
    RecordingStart {
        timestamp: f64,
    },
    RecordingStop {
        timestamp: f64,
    },
    Sample(SampleRow),
    CalibrationTimestamp {
        timestamp: f64,
    },
    Validation(Validation),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordKind {
    EventStart,
    EventStop,
    RecordingConfig,
    GazeCoords,
    RecordingStart,
    RecordingStop,
    Sample,
    CalibrationTimestamp,
    Validation,
}

/// The order in which record kinds are tried.
pub const CLASSIFICATION_ORDER: [RecordKind; 9] = [
    RecordKind::EventStart,
    RecordKind::EventStop,
    RecordKind::RecordingConfig,
    RecordKind::GazeCoords,
    RecordKind::RecordingStart,
    RecordKind::RecordingStop,
    RecordKind::Sample,
    RecordKind::CalibrationTimestamp,
    RecordKind::Validation,
];

impl RecordKind {
    /// Parse `line` as this kind of record.
    pub fn parse(self, line: &str, layout: EyeLayout) -> Option<Record> {
        match self {
            RecordKind::EventStart => {
                let caps = EVENT_START.captures(line)?;
                Some(Record::EventStart {
                    kind: EventKind::from_keyword(&caps["kind"])?,
                    eye: Eye::from_letter(&caps["eye"])?,
                    timestamp: timestamp(&caps, "timestamp")?,
                })
            }
            RecordKind::EventStop => {
                let caps = EVENT_STOP.captures(line)?;
                Some(Record::EventStop {
                    kind: EventKind::from_keyword(&caps["kind"])?,
                    eye: Eye::from_letter(&caps["eye"])?,
                    onset: timestamp(&caps, "onset")?,
                    offset: timestamp(&caps, "offset")?,
                })
            }
            RecordKind::RecordingConfig => RECORDING_CONFIG
                .captures(line)
                .and_then(|caps| RecordingConfig::from_captures(&caps))
                .map(Record::RecordingConfig),
            RecordKind::GazeCoords => {
                let caps = GAZE_COORDS.captures(line)?;
                let coords = caps["resolution"]
                    .split_whitespace()
                    .map(|c| c.parse::<f64>())
                    .collect::<Result<Vec<_>, _>>()
                    .ok()?;
                match coords.as_slice() {
                    [left, top, right, bottom] => Some(Record::GazeCoords {
                        width: right - left + 1.0,
                        height: bottom - top + 1.0,
                    }),
                    _ => None,
                }
            }
            RecordKind::RecordingStart => {
                let caps = RECORDING_START.captures(line)?;
                Some(Record::RecordingStart {
                    timestamp: timestamp(&caps, "timestamp")?,
                })
            }
            RecordKind::RecordingStop => {
                let caps = RECORDING_STOP.captures(line)?;
                Some(Record::RecordingStop {
                    timestamp: timestamp(&caps, "timestamp")?,
                })
            }
            RecordKind::Sample => SampleRow::parse(line, layout).ok().map(Record::Sample),
            RecordKind::CalibrationTimestamp => {
                let caps = CALIBRATION_TIMESTAMP.captures(line)?;
                Some(Record::CalibrationTimestamp {
                    timestamp: timestamp(&caps, "timestamp")?,
                })
            }
            RecordKind::Validation => VALIDATION
                .captures(line)
                .and_then(|caps| Validation::from_captures(&caps))
                .map(Record::Validation),
        }
    }
}

/// Classify `line`, trying each kind in [`CLASSIFICATION_ORDER`].
pub fn classify(line: &str, layout: EyeLayout) -> Option<Record> {
    CLASSIFICATION_ORDER
        .iter()
        .find_map(|kind| kind.parse(line, layout))
}
