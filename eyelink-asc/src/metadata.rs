//! Recording metadata assembled after all lines have been read.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use gazeframe::Value;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use thiserror::Error;

use crate::patterns::CompiledPattern;
use crate::records::{Calibration, RecordingConfig, SamplesConfig, Validation};

// Header and configuration lines read into metadata. Each fires at most once.
lazy_static! {
    static ref BUILTIN_REGEXES: Vec<Regex> = vec![
        Regex::new(r"^\*\*\s+VERSION:\s+(?P<version_1>.*?)\s*$").unwrap(),
        Regex::new(
            r"^\*\*\s+DATE:\s+(?P<weekday>[A-Z,a-z]+)\s+(?P<month>[A-Z,a-z]+)\s+(?P<day>\d\d?)\s+(?P<time>\d\d:\d\d:\d\d)\s+(?P<year>\d{4})"
        )
        .unwrap(),
        Regex::new(r"^\*\*\s+(?P<version_2>EYELINK.*?)\s*$").unwrap(),
        Regex::new(r"^MSG\s+\d+[.]?\d*\s+DISPLAY_COORDS\s*=?\s*(?P<DISPLAY_COORDS>.*?)\s*$").unwrap(),
        Regex::new(r"^PUPIL\s+(?P<pupil_data_type>AREA|DIAMETER)").unwrap(),
        Regex::new(r"^MSG\s+\d+[.]?\d*\s+ELCLCFG\s+(?P<mount_configuration>.*?)\s*$").unwrap(),
    ];
    static ref VERSION_2_NUMBER: Regex = Regex::new(r".*v(?P<version_number>[0-9]\.[0-9]+).*").unwrap();
    static ref VERSION_1_NUMBER: Regex = Regex::new(r".*\s+(?P<version_number>[0-9]\.[0-9]+).*").unwrap();
}

/// Names assigned by the header patterns.
const BUILTIN_KEYS: [&str; 10] = [
    "version_1",
    "version_2",
    "weekday",
    "month",
    "day",
    "time",
    "year",
    "DISPLAY_COORDS",
    "pupil_data_type",
    "mount_configuration",
];

pub(crate) fn builtin_patterns() -> Vec<CompiledPattern> {
    BUILTIN_REGEXES
        .iter()
        .cloned()
        .map(CompiledPattern::from_regex)
        .collect()
}

/// Non-fatal issues found while parsing. Each is logged when raised.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseWarning {
    #[error("No metadata found. Please check the file for errors.")]
    NoMetadata,
    #[error("No recording configuration found.")]
    NoRecordingConfig,
    #[error("No samples configuration found.")]
    NoSamplesConfig,
    #[error("Found inconsistent values for '{key}': [{}]", .values.join(", "))]
    Inconsistent { key: String, values: Vec<String> },
    #[error(
        "The recording configuration message and the samples message give inconsistent values \
         for 'sampling_rate': [{samples}, {recording}] Using the value from the samples message."
    )]
    SamplingRateMismatch { samples: f64, recording: f64 },
    #[error(
        "The recorded eye in the recording configuration message and the samples message are \
         inconsistent: [{recorded}, {tracked}] Using the value from the samples message and \
         storing the value from the recording configuration message in 'recorded_eye'."
    )]
    TrackedEyeMismatch { recorded: String, tracked: String },
    #[error("END recording message at {timestamp} without associated START")]
    EndWithoutStart { timestamp: f64 },
}

pub(crate) fn raise(warnings: &mut Vec<ParseWarning>, warning: ParseWarning) {
    warn!("{}", warning);
    warnings.push(warning);
}

/// Hardware mount of the eye tracker, decoded from the `ELCLCFG` code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountConfiguration {
    pub mount_type: String,
    pub head_stabilization: String,
    pub eyes_recorded: String,
    pub camera_position: Option<String>,
    pub short_name: String,
}

impl MountConfiguration {
    pub fn from_code(code: &str) -> MountConfiguration {
        const MONO: &str = "monocular";
        const BINO: &str = "binocular / monocular";
        let (mount_type, head_stabilization, eyes_recorded, camera_position) = match code {
            "MTABLER" => ("Desktop", "stabilized", MONO, None),
            "BTABLER" => ("Desktop", "stabilized", BINO, None),
            "RTABLER" => ("Desktop", "remote", MONO, None),
            "RBTABLER" => ("Desktop", "remote", BINO, None),
            "AMTABLER" => ("Arm Mount", "stabilized", MONO, None),
            "ABTABLER" => ("Arm Mount", "stabilized", BINO, None),
            "ARTABLER" => ("Arm Mount", "remote", MONO, None),
            "ABRTABLE" => ("Arm Mount", "remote", BINO, None),
            "BTOWER" => ("Binocular Tower Mount", "stabilized", BINO, None),
            "TOWER" => ("Tower Mount", "stabilized", MONO, None),
            "MPRIM" => ("Primate Mount", "stabilized", MONO, None),
            "BPRIM" => ("Primate Mount", "stabilized", BINO, None),
            "MLRR" => ("Long-Range Mount", "stabilized", MONO, Some("level")),
            "BLRR" => ("Long-Range Mount", "stabilized", BINO, Some("angled")),
            _ => ("unknown", "unknown", "unknown", Some("unknown")),
        };
        MountConfiguration {
            mount_type: mount_type.to_string(),
            head_stabilization: head_stabilization.to_string(),
            eyes_recorded: eyes_recorded.to_string(),
            camera_position: camera_position.map(String::from),
            short_name: code.to_string(),
        }
    }
}

/// Derive `(version_number, model)` from the two header version strings.
///
/// Both are `"unknown"` if no version number can be found.
pub fn parse_eyelink_version(version_1: &str, version_2: &str) -> (String, String) {
    let unknown = || ("unknown".to_string(), "unknown".to_string());

    if version_1 == "EYELINK II 1" && !version_2.is_empty() {
        let number = match VERSION_2_NUMBER.captures(version_2) {
            None => return unknown(),
            Some(caps) => caps["version_number"].to_string(),
        };
        let model = match number.parse::<f64>() {
            Err(_) => return unknown(),
            Ok(n) if n < 3.0 => "EyeLink II",
            Ok(n) if n < 5.0 => "EyeLink 1000",
            Ok(n) if n < 6.0 => "EyeLink 1000 Plus",
            Ok(_) => "EyeLink Portable Duo",
        };
        (number, model.to_string())
    } else {
        match VERSION_1_NUMBER.captures(version_1) {
            None => unknown(),
            Some(caps) => (caps["version_number"].to_string(), "EyeLink I".to_string()),
        }
    }
}

fn month_number(month: &str) -> Option<u32> {
    let months = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    months.iter().position(|m| *m == month).map(|i| i as u32 + 1)
}

/// Unique values in first-appearance order.
fn unique<T: PartialEq>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = vec![];
    for v in values {
        if !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// The single value all entries agree on, or `None` with a warning if they
/// disagree.
fn consistent<T, F>(
    key: &str,
    values: impl Iterator<Item = T>,
    describe: F,
    warnings: &mut Vec<ParseWarning>,
) -> Option<T>
where
    T: PartialEq + PartialOrd,
    F: Fn(&T) -> String,
{
    let mut values = unique(values);
    match values.len() {
        0 => None,
        1 => values.pop(),
        _ => {
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            raise(
                warnings,
                ParseWarning::Inconsistent {
                    key: key.to_string(),
                    values: values.iter().map(describe).collect(),
                },
            );
            None
        }
    }
}

/// Number of samples expected in a recording block of `duration` ms.
pub(crate) fn expected_samples(duration: f64, sampling_rate: f64) -> u64 {
    (duration * sampling_rate / 1000.0).round_ties_even().max(0.0) as u64
}

/// An `EBLINK` interval and the sample period in force when it closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BlinkInterval {
    pub onset: f64,
    pub offset: f64,
    pub period: Option<f64>,
}

/// Blink samples over the union of `intervals`. Overlapping intervals are
/// merged and counted once, using the period of the last merged interval.
pub(crate) fn blink_samples(intervals: &[BlinkInterval]) -> u64 {
    let mut sorted = intervals.to_vec();
    sorted.sort_by(|a, b| a.onset.total_cmp(&b.onset));

    let mut merged: Vec<BlinkInterval> = vec![];
    for interval in sorted {
        match merged.last_mut() {
            Some(last) if interval.onset <= last.offset => {
                last.offset = last.offset.max(interval.offset);
                last.period = interval.period;
            }
            _ => merged.push(interval),
        }
    }

    merged
        .iter()
        .filter_map(|b| {
            let period = b.period?;
            Some(((b.offset - b.onset) / period).round_ties_even().max(0.0) as u64 + 1)
        })
        .sum()
}

/// Sample counters gathered while reading recording blocks.
#[derive(Debug, Clone, Default)]
pub(crate) struct DataLossAccounting {
    pub total_recording_duration_ms: f64,
    pub num_expected_samples: u64,
    pub num_valid_samples: u64,
    pub blinks: Vec<BlinkInterval>,
}

/// Everything the parser collects besides the metadata patterns' matches.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    pub raw: BTreeMap<String, Value>,
    pub user_keys: Vec<String>,
    pub recording_config: Vec<RecordingConfig>,
    pub samples_config: Vec<SamplesConfig>,
    pub calibrations: Vec<Calibration>,
    pub validations: Vec<Validation>,
    pub accounting: DataLossAccounting,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub version_1: Option<String>,
    pub version_2: Option<String>,
    pub version_number: String,
    pub model: String,
    pub vendor: Option<String>,
    pub weekday: Option<String>,
    pub month: Option<String>,
    pub day: Option<u32>,
    pub year: Option<i32>,
    pub time: Option<String>,
    pub datetime: Option<NaiveDateTime>,
    /// `(left, top, right, bottom)` of the display in pixels.
    pub display_coords: Option<Vec<f64>>,
    pub pupil_data_type: Option<String>,
    pub mount_configuration: Option<MountConfiguration>,
    pub sampling_rate: Option<f64>,
    /// Eyes present in the samples: `L`, `R` or `LR`.
    pub tracked_eye: Option<String>,
    /// Eyes the tracker recorded, as stated in the recording configuration.
    pub recorded_eye: Option<String>,
    /// `(width, height)` of the gaze coordinate space.
    pub resolution: Option<(f64, f64)>,
    pub calibrations: Vec<Calibration>,
    pub validations: Vec<Validation>,
    pub recording_config: Vec<RecordingConfig>,
    pub samples_config: Vec<SamplesConfig>,
    pub total_recording_duration_ms: f64,
    pub num_expected_samples: u64,
    pub num_valid_samples: u64,
    pub num_blink_samples: u64,
    pub data_loss_ratio: f64,
    pub data_loss_ratio_blinks: f64,
    /// Values captured by user metadata patterns. Keys whose pattern never
    /// matched are null.
    pub extra: BTreeMap<String, Value>,
    pub warnings: Vec<ParseWarning>,
}

impl Metadata {
    /// A metadata value captured by a user pattern.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub(crate) fn finalize(collected: Collected) -> Metadata {
        let Collected {
            mut raw,
            user_keys,
            recording_config,
            samples_config,
            calibrations,
            validations,
            accounting,
            mut warnings,
        } = collected;

        if recording_config.is_empty() {
            raise(&mut warnings, ParseWarning::NoRecordingConfig);
        }
        if samples_config.is_empty() {
            raise(&mut warnings, ParseWarning::NoSamplesConfig);
        }

        let recording_rate = consistent(
            "sampling_rate",
            recording_config.iter().map(|c| c.sampling_rate),
            |v| v.to_string(),
            &mut warnings,
        );
        let samples_rate = consistent(
            "sampling_rate",
            samples_config.iter().filter_map(|c| c.sampling_rate),
            |v| v.to_string(),
            &mut warnings,
        );
        if let (Some(samples), Some(recording)) = (samples_rate, recording_rate) {
            if samples != recording {
                raise(
                    &mut warnings,
                    ParseWarning::SamplingRateMismatch { samples, recording },
                );
            }
        }

        let recorded_eye = consistent(
            "tracked_eye",
            recording_config.iter().map(|c| c.tracked_eye.clone()),
            |v| v.clone(),
            &mut warnings,
        );
        let samples_eye = consistent(
            "tracked_eye",
            samples_config.iter().map(|c| c.tracked_eye.clone()),
            |v| v.clone(),
            &mut warnings,
        );
        if let (Some(tracked), Some(recorded)) = (&samples_eye, &recorded_eye) {
            if tracked != recorded {
                raise(
                    &mut warnings,
                    ParseWarning::TrackedEyeMismatch {
                        recorded: recorded.clone(),
                        tracked: tracked.clone(),
                    },
                );
            }
        }

        let resolution = consistent(
            "resolution",
            recording_config.iter().filter_map(|c| c.resolution),
            |(w, h)| format!("({:.1}, {:.1})", w, h),
            &mut warnings,
        );

        let mut take = |key: &str| match raw.remove(key) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        };
        let version_1 = take("version_1");
        let version_2 = take("version_2");
        let (version_number, model) = parse_eyelink_version(
            version_1.as_deref().unwrap_or(""),
            version_2.as_deref().unwrap_or(""),
        );
        let vendor = if model.contains("EyeLink") {
            Some("SR Research".to_string())
        } else {
            None
        };
        let weekday = take("weekday");
        let month = take("month");
        let day = take("day").and_then(|d| d.parse().ok());
        let year = take("year").and_then(|y| y.parse().ok());
        let time = take("time");
        let display_coords = take("DISPLAY_COORDS").and_then(|c| {
            c.split_whitespace()
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .ok()
        });
        let pupil_data_type = take("pupil_data_type");
        let mount_configuration =
            take("mount_configuration").map(|code| MountConfiguration::from_code(&code));

        let datetime = match (year, month.as_deref().and_then(month_number), day, &time) {
            (Some(year), Some(month), Some(day), Some(time)) => NaiveDate::from_ymd_opt(year, month, day)
                .zip(NaiveTime::parse_from_str(time, "%H:%M:%S").ok())
                .map(|(date, time)| date.and_time(time)),
            _ => None,
        };

        for key in BUILTIN_KEYS.iter() {
            raw.remove(*key);
        }
        for key in user_keys {
            raw.entry(key).or_insert(Value::Null);
        }

        let num_blink_samples = blink_samples(&accounting.blinks);
        let expected = accounting.num_expected_samples;
        // Blinks may outlast their block and samples may lie past its END,
        // so both ratios are clamped into [0, 1].
        let (data_loss_ratio, data_loss_ratio_blinks) = if expected == 0 {
            (0.0, 0.0)
        } else {
            (
                ((expected as f64 - accounting.num_valid_samples as f64) / expected as f64)
                    .clamp(0.0, 1.0),
                (num_blink_samples as f64 / expected as f64).clamp(0.0, 1.0),
            )
        };
        debug!(
            "{} of {} expected samples valid, {} lost to blinks",
            accounting.num_valid_samples, expected, num_blink_samples
        );

        Metadata {
            version_1,
            version_2,
            version_number,
            model,
            vendor,
            weekday,
            month,
            day,
            year,
            time,
            datetime,
            display_coords,
            pupil_data_type,
            mount_configuration,
            sampling_rate: samples_rate.or(recording_rate),
            tracked_eye: samples_eye.or_else(|| recorded_eye.clone()),
            recorded_eye,
            resolution,
            calibrations,
            validations,
            recording_config,
            samples_config,
            total_recording_duration_ms: accounting.total_recording_duration_ms,
            num_expected_samples: expected,
            num_valid_samples: accounting.num_valid_samples,
            num_blink_samples,
            data_loss_ratio,
            data_loss_ratio_blinks,
            extra: raw,
            warnings,
        }
    }
}
