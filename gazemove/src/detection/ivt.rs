use gazeframe::{Events, TimeColumn};
use log::debug;
use serde::Deserialize;

use super::{
    check_positive, events_from_spans, qualifying_runs, timesteps_or_indices, DetectionError,
    EyeSelector,
};

/// Parameters of the velocity-threshold fixation detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IvtOptions {
    /// Largest velocity magnitude still counted as fixating.
    pub velocity_threshold: f64,
    pub minimum_duration: f64,
    pub include_nan: bool,
    pub eye: EyeSelector,
    pub name: String,
}

impl Default for IvtOptions {
    fn default() -> Self {
        IvtOptions {
            velocity_threshold: 20.0,
            minimum_duration: 100.0,
            include_nan: false,
            eye: EyeSelector::Auto,
            name: "fixation".to_string(),
        }
    }
}

/// Detect fixations with the velocity-threshold (I-VT) algorithm.
///
/// Consecutive samples whose selected velocity has a Euclidean norm of at
/// most `velocity_threshold` form a candidate; candidates spanning at least
/// `minimum_duration` become events.
pub fn ivt(
    velocities: &[&[f64]],
    timesteps: Option<&TimeColumn>,
    options: &IvtOptions,
) -> Result<Events, DetectionError> {
    check_positive("velocity_threshold", options.velocity_threshold)?;
    check_positive("minimum_duration", options.minimum_duration)?;
    let (vx, vy) = options.eye.select(velocities)?;
    let timesteps = timesteps_or_indices(timesteps, vx.len())?;

    let mut missing = Vec::with_capacity(vx.len());
    let mut candidate = Vec::with_capacity(vx.len());
    for (a, b) in vx.iter().zip(vy) {
        let norm = a.hypot(*b);
        missing.push(norm.is_nan());
        candidate.push(if norm.is_nan() {
            options.include_nan
        } else {
            norm <= options.velocity_threshold
        });
    }

    let spans = qualifying_runs(&candidate, &missing, &timesteps, options.minimum_duration);
    debug!("I-VT found {} fixations in {} samples", spans.len(), vx.len());
    events_from_spans(&options.name, &timesteps, &spans)
}
