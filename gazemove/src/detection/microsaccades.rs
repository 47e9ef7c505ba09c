use std::fmt;
use std::str::FromStr;

use gazeframe::{Events, TimeColumn};
use log::debug;
use serde::Deserialize;

use super::{
    check_positive, events_from_spans, qualifying_runs, timesteps_or_indices, DetectionError,
    EyeSelector,
};

/// Per-axis velocity spread estimators.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ThresholdMethod {
    /// Population standard deviation.
    Std,
    /// Median absolute deviation.
    Mad,
    /// `sqrt(median(v^2) - median(v)^2)`, Engbert & Kliegl (2003).
    Engbert2003,
    /// `sqrt(median((v - median(v))^2))`, Engbert et al. (2015).
    Engbert2015,
}

impl fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThresholdMethod::Std => "std",
            ThresholdMethod::Mad => "mad",
            ThresholdMethod::Engbert2003 => "engbert2003",
            ThresholdMethod::Engbert2015 => "engbert2015",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ThresholdMethod {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<ThresholdMethod, DetectionError> {
        match s {
            "std" => Ok(ThresholdMethod::Std),
            "mad" => Ok(ThresholdMethod::Mad),
            "engbert2003" => Ok(ThresholdMethod::Engbert2003),
            "engbert2015" => Ok(ThresholdMethod::Engbert2015),
            _ => Err(DetectionError::UnknownThresholdMethod(s.to_string())),
        }
    }
}

/// The semi-axes of the velocity ellipse, given directly or estimated from
/// the data.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawThreshold")]
pub enum MicrosaccadeThreshold {
    Fixed(f64, f64),
    Method(ThresholdMethod),
}

impl Default for MicrosaccadeThreshold {
    fn default() -> Self {
        MicrosaccadeThreshold::Method(ThresholdMethod::Engbert2015)
    }
}

/// `threshold = 1e-5`, `threshold = [1e-5, 2e-5]` or `threshold = "mad"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawThreshold {
    Single(f64),
    Pair([f64; 2]),
    Name(String),
}

impl TryFrom<RawThreshold> for MicrosaccadeThreshold {
    type Error = DetectionError;

    fn try_from(raw: RawThreshold) -> Result<MicrosaccadeThreshold, DetectionError> {
        Ok(match raw {
            RawThreshold::Single(t) => MicrosaccadeThreshold::Fixed(t, t),
            RawThreshold::Pair([tx, ty]) => MicrosaccadeThreshold::Fixed(tx, ty),
            RawThreshold::Name(name) => MicrosaccadeThreshold::Method(name.parse()?),
        })
    }
}

/// Parameters of the microsaccade detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MicrosaccadeOptions {
    pub threshold: MicrosaccadeThreshold,
    /// Multiplier turning the threshold into the ellipse radius.
    pub threshold_factor: f64,
    /// Thresholds below this on either axis are rejected.
    pub minimum_threshold: f64,
    pub minimum_duration: f64,
    pub include_nan: bool,
    pub eye: EyeSelector,
    pub name: String,
}

impl Default for MicrosaccadeOptions {
    fn default() -> Self {
        MicrosaccadeOptions {
            threshold: MicrosaccadeThreshold::default(),
            threshold_factor: 6.0,
            minimum_threshold: 1e-10,
            minimum_duration: 6.0,
            include_nan: false,
            eye: EyeSelector::Auto,
            name: "saccade".to_string(),
        }
    }
}

fn nanmedian(values: impl Iterator<Item = f64>) -> f64 {
    let mut v: Vec<f64> = values.filter(|x| !x.is_nan()).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}

fn nanstd(values: &[f64]) -> f64 {
    let v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    let n = v.len() as f64;
    let mean = v.iter().sum::<f64>() / n;
    (v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt()
}

fn spread(values: &[f64], method: ThresholdMethod) -> f64 {
    match method {
        ThresholdMethod::Std => nanstd(values),
        ThresholdMethod::Mad => {
            let median = nanmedian(values.iter().copied());
            nanmedian(values.iter().map(|v| (v - median).abs()))
        }
        ThresholdMethod::Engbert2003 => {
            let median = nanmedian(values.iter().copied());
            (nanmedian(values.iter().map(|v| v * v)) - median * median).sqrt()
        }
        ThresholdMethod::Engbert2015 => {
            let median = nanmedian(values.iter().copied());
            nanmedian(values.iter().map(|v| (v - median).powi(2))).sqrt()
        }
    }
}

/// Estimate the `(x, y)` threshold of a 2D velocity series, ignoring
/// missing samples.
pub fn compute_threshold(
    velocities: &[&[f64]],
    method: ThresholdMethod,
) -> Result<(f64, f64), DetectionError> {
    let (vx, vy) = EyeSelector::Auto.select(velocities)?;
    Ok((spread(vx, method), spread(vy, method)))
}

/// Detect microsaccades as runs of samples outside the velocity ellipse.
///
/// The ellipse semi-axes are the threshold times `threshold_factor`; a
/// sample is fast when `(vx/rx)^2 + (vy/ry)^2 > 1`.
pub fn microsaccades(
    velocities: &[&[f64]],
    timesteps: Option<&TimeColumn>,
    options: &MicrosaccadeOptions,
) -> Result<Events, DetectionError> {
    check_positive("threshold_factor", options.threshold_factor)?;
    check_positive("minimum_duration", options.minimum_duration)?;
    let (vx, vy) = options.eye.select(velocities)?;
    let timesteps = timesteps_or_indices(timesteps, vx.len())?;

    let (tx, ty) = match options.threshold {
        MicrosaccadeThreshold::Fixed(tx, ty) => (tx, ty),
        MicrosaccadeThreshold::Method(method) => compute_threshold(&[vx, vy], method)?,
    };
    // NaN thresholds fail this check too.
    if !(tx >= options.minimum_threshold && ty >= options.minimum_threshold) {
        return Err(DetectionError::LowVariance(tx, ty, options.minimum_threshold));
    }
    let (rx, ry) = (tx * options.threshold_factor, ty * options.threshold_factor);
    debug!("Microsaccade radius ({}, {})", rx, ry);

    let mut missing = Vec::with_capacity(vx.len());
    let mut candidate = Vec::with_capacity(vx.len());
    for (a, b) in vx.iter().zip(vy) {
        let nan = a.is_nan() || b.is_nan();
        missing.push(nan);
        candidate.push(if nan {
            options.include_nan
        } else {
            (a / rx).powi(2) + (b / ry).powi(2) > 1.0
        });
    }

    let spans = qualifying_runs(&candidate, &missing, &timesteps, options.minimum_duration);
    debug!("Found {} microsaccades in {} samples", spans.len(), vx.len());
    events_from_spans(&options.name, &timesteps, &spans)
}
