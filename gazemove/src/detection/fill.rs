use gazeframe::{Events, TimeColumn};
use log::debug;
use serde::Deserialize;

use super::{events_from_spans, runs, DetectionError};

/// Parameters of the gap filler.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FillOptions {
    /// Gaps shorter than this are left uncovered.
    pub minimum_duration: f64,
    pub name: String,
    /// Discard existing events and cover the whole range with one event.
    pub clear: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        FillOptions {
            minimum_duration: 0.0,
            name: "unclassified".to_string(),
            clear: false,
        }
    }
}

/// Cover every timestep not inside an existing event with new events.
///
/// `timesteps` must be non-decreasing. Returns the existing events together
/// with one event per maximal run of uncovered timesteps, sorted by onset.
/// Existing events are never changed and the new events never overlap them.
/// Events with a missing onset or offset cover no timestep.
pub fn fill(
    events: &Events,
    timesteps: &TimeColumn,
    options: &FillOptions,
) -> Result<Events, DetectionError> {
    if options.minimum_duration < 0.0 {
        return Err(DetectionError::Negative {
            parameter: "minimum_duration",
            value: options.minimum_duration,
        });
    }

    if options.clear {
        let spans = if timesteps.is_empty() {
            vec![]
        } else {
            vec![(0, timesteps.len() - 1)]
        };
        return events_from_spans(&options.name, timesteps, &spans);
    }

    let mut intervals: Vec<(f64, f64)> = events
        .rows()
        .filter(|row| !row.onset.is_nan())
        .map(|row| (row.onset, row.offset))
        .collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Sweep over sorted timesteps, tracking the furthest offset of every
    // event that has started.
    let mut uncovered = Vec::with_capacity(timesteps.len());
    let mut next = 0;
    let mut reach = f64::NEG_INFINITY;
    for t in timesteps.iter() {
        while next < intervals.len() && intervals[next].0 <= t {
            reach = reach.max(intervals[next].1);
            next += 1;
        }
        uncovered.push(t > reach);
    }

    let gaps: Vec<(usize, usize)> = runs(&uncovered)
        .into_iter()
        .filter(|&(start, end)| timesteps.get(end) - timesteps.get(start) >= options.minimum_duration)
        .collect();
    debug!("Filling {} gaps between {} events", gaps.len(), events.len());

    let mut filled = Events::concat(&[
        events.clone(),
        events_from_spans(&options.name, timesteps, &gaps)?,
    ]);
    filled.sort_by_onset();
    Ok(filled)
}
