use std::collections::BTreeMap;
use std::path::Path;

use eyelink_asc::{parse_eyelink, AscParserError, Metadata, ParseOptions};
use gazeframe::{Events, FrameError, Samples, TimeColumn, Value};
use log::{debug, info};
use thiserror::Error;

use crate::detection::{
    check_positive, fill, idt, ivt, microsaccades, DetectionError, DetectionMethod,
};

#[derive(Error, Debug)]
pub enum GazeError {
    #[error(transparent)]
    Parse(#[from] AscParserError),
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("No sampling rate known, cannot compute velocities.")]
    MissingSamplingRate,
}

/// A recording's samples together with its events.
///
/// Samples and events are partitioned by the trial columns before any
/// temporal reasoning, so detectors never bridge two trials.
#[derive(Debug, Clone)]
pub struct Gaze {
    samples: Samples,
    events: Events,
    metadata: Option<Metadata>,
    trial_columns: Vec<String>,
    sampling_rate: Option<f64>,
    /// One series per pixel channel, aligned with the sample rows.
    velocities: Option<Vec<Vec<f64>>>,
}

fn gather(columns: &[&[f64]], indices: &[usize]) -> Vec<Vec<f64>> {
    columns
        .iter()
        .map(|c| indices.iter().map(|&i| c[i]).collect())
        .collect()
}

fn as_slices(columns: &[Vec<f64>]) -> Vec<&[f64]> {
    columns.iter().map(|c| c.as_slice()).collect()
}

impl Gaze {
    pub fn new(samples: Samples, events: Events) -> Gaze {
        Gaze {
            samples,
            events,
            metadata: None,
            trial_columns: vec![],
            sampling_rate: None,
            velocities: None,
        }
    }

    /// Parse an ASC file. The sampling rate is taken from its metadata.
    pub fn from_asc<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Gaze, GazeError> {
        let (samples, events, metadata) = parse_eyelink(path, options)?;
        info!(
            "Parsed {} samples and {} events",
            samples.len(),
            events.len()
        );
        Ok(Gaze {
            sampling_rate: metadata.sampling_rate,
            metadata: Some(metadata),
            ..Gaze::new(samples, events)
        })
    }

    /// Partition by `columns`, which must all be sample columns.
    pub fn with_trial_columns(mut self, columns: Vec<String>) -> Result<Gaze, GazeError> {
        if let Some(missing) = columns.iter().find(|c| !self.samples.has_column(c)) {
            return Err(FrameError::ColumnNotFound(missing.clone()).into());
        }
        self.trial_columns = columns;
        self.velocities = None;
        Ok(self)
    }

    pub fn with_sampling_rate(mut self, sampling_rate: f64) -> Result<Gaze, GazeError> {
        check_positive("sampling_rate", sampling_rate)?;
        self.sampling_rate = Some(sampling_rate);
        self.velocities = None;
        Ok(self)
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn trial_columns(&self) -> &[String] {
        &self.trial_columns
    }

    pub fn sampling_rate(&self) -> Option<f64> {
        self.sampling_rate
    }

    pub fn velocities(&self) -> Option<&[Vec<f64>]> {
        self.velocities.as_deref()
    }

    /// Velocities in pixels per second from the difference to the preceding
    /// sample of the same trial. The first sample of every trial is NaN.
    pub fn compute_velocities(&mut self) -> Result<(), GazeError> {
        let rate = self.sampling_rate.ok_or(GazeError::MissingSamplingRate)?;
        let partitions = self.samples.partition_by(&self.trial_columns)?;
        let channels = self.samples.layout().pixel_channels();

        let mut velocities = vec![vec![f64::NAN; self.samples.len()]; channels.len()];
        for (v, &channel) in velocities.iter_mut().zip(channels) {
            let p = self.samples.channel_at(channel);
            for partition in &partitions {
                for pair in partition.indices.windows(2) {
                    v[pair[1]] = (p[pair[1]] - p[pair[0]]) * rate;
                }
            }
        }
        debug!(
            "Computed velocities at {} Hz over {} trials",
            rate,
            partitions.len()
        );
        self.velocities = Some(velocities);
        Ok(())
    }

    /// Indices of the events belonging to the trial identified by `key`.
    /// Events lacking a trial column count as null there.
    fn trial_events(&self, key: &[Value]) -> Vec<usize> {
        let columns: Vec<Option<&[Value]>> = self
            .trial_columns
            .iter()
            .map(|c| self.events.column(c))
            .collect();
        (0..self.events.len())
            .filter(|&row| {
                columns.iter().zip(key).all(|(column, value)| match column {
                    Some(c) => &c[row] == value,
                    None => value.is_null(),
                })
            })
            .collect()
    }

    /// Run one detector on every trial and merge the results into the
    /// events table, tagged with the trial column values.
    ///
    /// Gap filling replaces each trial's events with the filled sequence.
    /// Velocity-based detectors compute velocities first if needed.
    pub fn detect(&mut self, method: &DetectionMethod) -> Result<(), GazeError> {
        if method.needs_velocities() && self.velocities.is_none() {
            self.compute_velocities()?;
        }
        let partitions = self.samples.partition_by(&self.trial_columns)?;
        let time = self.samples.time();
        let positions: Vec<&[f64]> = self
            .samples
            .layout()
            .pixel_channels()
            .iter()
            .map(|&c| self.samples.channel_at(c))
            .collect();
        let velocities: Vec<&[f64]> = self
            .velocities
            .iter()
            .flatten()
            .map(|v| v.as_slice())
            .collect();

        let mut replaced = vec![false; self.events.len()];
        let mut detected = vec![];
        for partition in partitions.iter().filter(|p| !p.indices.is_empty()) {
            let timesteps = TimeColumn::Float(partition.indices.iter().map(|&i| time[i]).collect());
            let mut events = match method {
                DetectionMethod::Idt(options) => {
                    let trial = gather(&positions, &partition.indices);
                    idt(&as_slices(&trial), Some(&timesteps), options)?
                }
                DetectionMethod::Ivt(options) => {
                    let trial = gather(&velocities, &partition.indices);
                    ivt(&as_slices(&trial), Some(&timesteps), options)?
                }
                DetectionMethod::Microsaccades(options) => {
                    let trial = gather(&velocities, &partition.indices);
                    microsaccades(&as_slices(&trial), Some(&timesteps), options)?
                }
                DetectionMethod::Fill(options) => {
                    let members = self.trial_events(&partition.key);
                    for &i in &members {
                        replaced[i] = true;
                    }
                    fill(&self.events.take(&members), &timesteps, options)?
                }
            };
            for (column, value) in self.trial_columns.iter().zip(&partition.key) {
                events.fill_column(column, value.clone());
            }
            debug!(
                "{} produced {} events for trial {:?}",
                method,
                events.len(),
                partition.key
            );
            detected.push(events);
        }

        let kept: Vec<usize> = (0..self.events.len()).filter(|&i| !replaced[i]).collect();
        let mut frames = vec![self.events.take(&kept)];
        frames.extend(detected);
        self.events = Events::concat(&frames);
        info!("{} done, {} events in total", method, self.events.len());
        Ok(())
    }

    /// Number of events per event name.
    pub fn event_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for name in self.events.names() {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
        counts
    }
}
