use gazeframe::{Events, TimeColumn};
use log::debug;
use serde::Deserialize;

use super::{check_positive, events_from_spans, timesteps_or_indices, DetectionError, EyeSelector};

/// Parameters of the dispersion-threshold fixation detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IdtOptions {
    /// Upper bound on `(max x - min x) + (max y - min y)` within a fixation,
    /// in position units.
    pub dispersion_threshold: f64,
    /// Shortest fixation kept, in time units.
    pub minimum_duration: f64,
    /// Let missing samples sit inside a window instead of closing it.
    pub include_nan: bool,
    pub eye: EyeSelector,
    pub name: String,
}

impl Default for IdtOptions {
    fn default() -> Self {
        IdtOptions {
            dispersion_threshold: 1.0,
            minimum_duration: 100.0,
            include_nan: false,
            eye: EyeSelector::Auto,
            name: "fixation".to_string(),
        }
    }
}

/// Running bounding box of a window.
#[derive(Debug, Copy, Clone)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn new(x: f64, y: f64) -> Bounds {
        Bounds {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn with(self, x: f64, y: f64) -> Bounds {
        Bounds {
            min_x: self.min_x.min(x),
            max_x: self.max_x.max(x),
            min_y: self.min_y.min(y),
            max_y: self.max_y.max(y),
        }
    }

    fn dispersion(&self) -> f64 {
        (self.max_x - self.min_x) + (self.max_y - self.min_y)
    }
}

/// Detect fixations with the dispersion-threshold (I-DT) algorithm.
///
/// A window starts at the first unconsumed sample and grows while its
/// dispersion stays within `dispersion_threshold`. A finished window that
/// spans at least `minimum_duration` becomes a fixation and scanning resumes
/// after it; otherwise the window start moves forward by one sample.
pub fn idt(
    positions: &[&[f64]],
    timesteps: Option<&TimeColumn>,
    options: &IdtOptions,
) -> Result<Events, DetectionError> {
    check_positive("dispersion_threshold", options.dispersion_threshold)?;
    check_positive("minimum_duration", options.minimum_duration)?;
    let (x, y) = options.eye.select(positions)?;
    let timesteps = timesteps_or_indices(timesteps, x.len())?;

    let n = x.len();
    let missing: Vec<bool> = x.iter().zip(y).map(|(a, b)| a.is_nan() || b.is_nan()).collect();
    let mut spans = vec![];
    let mut start = 0;
    while start < n {
        if missing[start] {
            start += 1;
            continue;
        }

        let mut bounds = Bounds::new(x[start], y[start]);
        let mut end = start;
        while end + 1 < n {
            let next = end + 1;
            if missing[next] {
                if !options.include_nan {
                    break;
                }
                end = next;
                continue;
            }
            let grown = bounds.with(x[next], y[next]);
            if grown.dispersion() > options.dispersion_threshold {
                break;
            }
            bounds = grown;
            end = next;
        }
        while missing[end] {
            end -= 1;
        }

        if timesteps.get(end) - timesteps.get(start) >= options.minimum_duration {
            spans.push((start, end));
            start = end + 1;
        } else {
            start += 1;
        }
    }
    debug!("I-DT found {} fixations in {} samples", spans.len(), n);
    events_from_spans(&options.name, &timesteps, &spans)
}
