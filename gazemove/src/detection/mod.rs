//! Event detection over timestamped position and velocity series.
//!
//! Every detector is a pure function over column-major input: one slice per
//! component, all of equal length. Two components are one eye's `x, y`;
//! four are `x_left, y_left, x_right, y_right`; six add a cyclopean pair.
//! When no timesteps are given, sample indices are used.
//!
//! All detectors share one shape: scan for a run start, grow the run, then
//! emit it if it lasted `minimum_duration` or drop it, and resume scanning.
use std::fmt;
use std::str::FromStr;

use gazeframe::{Events, FrameError, TimeColumn};
use serde::Deserialize;
use thiserror::Error;

mod fill;
mod idt;
mod ivt;
mod microsaccades;

pub use fill::{fill, FillOptions};
pub use idt::{idt, IdtOptions};
pub use ivt::{ivt, IvtOptions};
pub use microsaccades::{
    compute_threshold, microsaccades, MicrosaccadeOptions, MicrosaccadeThreshold,
    ThresholdMethod,
};

#[derive(Error, Debug, PartialEq)]
pub enum DetectionError {
    #[error("`{parameter}` must be positive, got {value}.")]
    NonPositive { parameter: &'static str, value: f64 },
    #[error("`{parameter}` must not be negative, got {value}.")]
    Negative { parameter: &'static str, value: f64 },
    #[error("Unknown eye `{0}`, expected one of: auto, left, right, cyclops.")]
    UnknownEye(String),
    #[error("Eye `{eye}` requires {expected} components, found {found}.")]
    Components {
        eye: EyeSelector,
        expected: &'static str,
        found: usize,
    },
    #[error("Unknown threshold method `{0}`, expected one of: std, mad, engbert2003, engbert2015.")]
    UnknownThresholdMethod(String),
    #[error("Threshold ({0}, {1}) does not provide enough variance, minimum is {2}.")]
    LowVariance(f64, f64, f64),
    #[error("`{what}` has length {found}, expected {expected}.")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Which eye's 2D sub-vector a detector looks at.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum EyeSelector {
    /// The input must hold exactly one eye.
    Auto,
    Left,
    Right,
    Cyclops,
}

impl Default for EyeSelector {
    fn default() -> Self {
        EyeSelector::Auto
    }
}

impl EyeSelector {
    /// Component indices of the selected `x, y` pair in an input with
    /// `components` components.
    pub fn resolve(self, components: usize) -> Result<(usize, usize), DetectionError> {
        let (pair, expected, ok) = match self {
            EyeSelector::Auto => ((0, 1), "exactly 2", components == 2),
            EyeSelector::Left => ((0, 1), "at least 4", components >= 4),
            EyeSelector::Right => ((2, 3), "at least 4", components >= 4),
            EyeSelector::Cyclops => ((4, 5), "at least 6", components >= 6),
        };
        if ok {
            Ok(pair)
        } else {
            Err(DetectionError::Components {
                eye: self,
                expected,
                found: components,
            })
        }
    }

    /// Borrow the selected `x, y` pair out of `components`.
    pub fn select<'a>(self, components: &[&'a [f64]]) -> Result<(&'a [f64], &'a [f64]), DetectionError> {
        let (x, y) = self.resolve(components.len())?;
        let n = components[0].len();
        for c in components.iter() {
            if c.len() != n {
                return Err(DetectionError::LengthMismatch {
                    what: "components",
                    expected: n,
                    found: c.len(),
                });
            }
        }
        Ok((components[x], components[y]))
    }
}

impl fmt::Display for EyeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EyeSelector::Auto => "auto",
            EyeSelector::Left => "left",
            EyeSelector::Right => "right",
            EyeSelector::Cyclops => "cyclops",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EyeSelector {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<EyeSelector, DetectionError> {
        match s {
            "auto" => Ok(EyeSelector::Auto),
            "left" => Ok(EyeSelector::Left),
            "right" => Ok(EyeSelector::Right),
            "cyclops" => Ok(EyeSelector::Cyclops),
            _ => Err(DetectionError::UnknownEye(s.to_string())),
        }
    }
}

impl TryFrom<String> for EyeSelector {
    type Error = DetectionError;

    fn try_from(s: String) -> Result<EyeSelector, DetectionError> {
        s.parse()
    }
}

/// One configured detection pass, as listed under `[[detect]]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum DetectionMethod {
    Idt(IdtOptions),
    Ivt(IvtOptions),
    Microsaccades(MicrosaccadeOptions),
    Fill(FillOptions),
}

impl DetectionMethod {
    /// Whether the detector consumes velocities rather than positions.
    pub fn needs_velocities(&self) -> bool {
        matches!(self, DetectionMethod::Ivt(_) | DetectionMethod::Microsaccades(_))
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DetectionMethod::Idt(_) => "idt",
            DetectionMethod::Ivt(_) => "ivt",
            DetectionMethod::Microsaccades(_) => "microsaccades",
            DetectionMethod::Fill(_) => "fill",
        };
        write!(f, "{}", s)
    }
}

pub(crate) fn check_positive(parameter: &'static str, value: f64) -> Result<(), DetectionError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(DetectionError::NonPositive { parameter, value })
    }
}

/// The given timesteps, or sample indices `0..n`.
pub(crate) fn timesteps_or_indices(
    timesteps: Option<&TimeColumn>,
    n: usize,
) -> Result<TimeColumn, DetectionError> {
    match timesteps {
        None => Ok(TimeColumn::indices(n)),
        Some(t) if t.len() == n => Ok(t.clone()),
        Some(t) => Err(DetectionError::LengthMismatch {
            what: "timesteps",
            expected: n,
            found: t.len(),
        }),
    }
}

/// Inclusive `(start, end)` spans of consecutive `true` values.
pub(crate) fn runs(mask: &[bool]) -> Vec<(usize, usize)> {
    let mut spans = vec![];
    let mut start = None;
    for (i, &on) in mask.iter().enumerate() {
        match (on, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                spans.push((s, i - 1));
                start = None;
            }
            _ => (),
        }
    }
    if let Some(s) = start {
        spans.push((s, mask.len() - 1));
    }
    spans
}

/// Shrink `span` until neither end is a missing sample. `None` if every
/// sample in the span is missing.
pub(crate) fn trim_missing(span: (usize, usize), missing: &[bool]) -> Option<(usize, usize)> {
    let (mut start, mut end) = span;
    while start <= end && missing[start] {
        start += 1;
    }
    while end > start && missing[end] {
        end -= 1;
    }
    if start > end {
        None
    } else {
        Some((start, end))
    }
}

/// Candidate runs of `candidate`, trimmed of missing samples at both ends
/// and kept only if they last at least `minimum_duration`.
pub(crate) fn qualifying_runs(
    candidate: &[bool],
    missing: &[bool],
    timesteps: &TimeColumn,
    minimum_duration: f64,
) -> Vec<(usize, usize)> {
    runs(candidate)
        .into_iter()
        .filter_map(|span| trim_missing(span, missing))
        .filter(|&(start, end)| timesteps.get(end) - timesteps.get(start) >= minimum_duration)
        .collect()
}

/// One event per span, named `name`, keeping the timestep column type.
pub(crate) fn events_from_spans(
    name: &str,
    timesteps: &TimeColumn,
    spans: &[(usize, usize)],
) -> Result<Events, DetectionError> {
    let onsets: Vec<usize> = spans.iter().map(|s| s.0).collect();
    let offsets: Vec<usize> = spans.iter().map(|s| s.1).collect();
    Ok(Events::new(
        name,
        timesteps.take(&onsets),
        timesteps.take(&offsets),
    )?)
}
