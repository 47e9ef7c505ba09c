//! Functions for parsing SR Research's [ASC files][asc].
//!
//! Parsing runs in two passes. The first finds every `SAMPLES` configuration
//! line, which fixes the sample layout (monocular or binocular). The second
//! feeds each line through a [`ParserState`], which updates the additional
//! columns, the open events and the recording-block accounting.
//!
//! [asc]: http://download.sr-support.com/dispdoc/page25.html

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use encoding_rs::Encoding;
use gazeframe::{DataType, Events, EyeLayout, Samples, Value};
use log::{debug, info};

use crate::metadata::{self, raise, BlinkInterval, Collected, Metadata, ParseWarning};
use crate::patterns::{compile_patterns, pattern_keys, CompiledPattern, PatternField, PatternSpec};
use crate::records::{self, Calibration, EventKind, Record, SamplesConfig};
use crate::AscParserError;

/// Options for [`parse_eyelink`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Text encoding label, e.g. `latin1`. Defaults to UTF-8.
    pub encoding: Option<String>,
    /// Patterns producing additional sample and event columns.
    pub patterns: Vec<PatternSpec>,
    /// Patterns producing additional metadata entries.
    pub metadata_patterns: Vec<PatternSpec>,
    /// Type overrides for additional columns.
    pub schema: BTreeMap<String, DataType>,
}

/// Per-line parser state.
struct ParserState<'p> {
    layout: EyeLayout,
    column_patterns: &'p [CompiledPattern],
    unmatched_metadata: Vec<CompiledPattern>,
    matched_metadata: Vec<CompiledPattern>,
    raw_metadata: BTreeMap<String, Value>,
    current_additional: BTreeMap<String, Value>,
    event_additional: BTreeMap<EventKind, BTreeMap<String, Value>>,
    blinking: bool,
    pending_calibration: Option<f64>,
    recording_start: Option<f64>,
    collected: Collected,
    samples: Samples,
    events: Events,
}

impl<'p> ParserState<'p> {
    fn new(
        layout: EyeLayout,
        column_patterns: &'p [CompiledPattern],
        metadata_patterns: Vec<CompiledPattern>,
    ) -> ParserState<'p> {
        let columns = pattern_keys(column_patterns);
        let user_keys = pattern_keys(&metadata_patterns).into_iter().collect();
        let mut unmatched_metadata = metadata_patterns;
        unmatched_metadata.extend(metadata::builtin_patterns());

        let mut event_columns = columns.clone();
        event_columns.insert("eye".to_string());

        ParserState {
            layout,
            column_patterns,
            unmatched_metadata,
            matched_metadata: vec![],
            raw_metadata: BTreeMap::new(),
            current_additional: columns.iter().map(|c| (c.clone(), Value::Null)).collect(),
            event_additional: BTreeMap::new(),
            blinking: false,
            pending_calibration: None,
            recording_start: None,
            collected: Collected {
                user_keys,
                ..Collected::default()
            },
            samples: Samples::new(layout, columns),
            events: Events::with_columns(event_columns),
        }
    }

    fn step(&mut self, line: &str) {
        for pattern in self.column_patterns {
            pattern.apply(line, &mut self.current_additional);
        }

        // The line after a `!CAL` message is its summary, whatever else it
        // looks like.
        if let Some(timestamp) = self.pending_calibration.take() {
            self.collected
                .calibrations
                .push(Calibration::from_summary(timestamp, line));
            return;
        }

        match records::classify(line, self.layout) {
            Some(record) => self.handle(record),
            None => self.match_metadata(line),
        }
    }

    fn sample_period(&self) -> Option<f64> {
        self.collected
            .recording_config
            .last()
            .map(|c| c.sample_period())
    }

    fn handle(&mut self, record: Record) {
        match record {
            Record::EventStart { kind, .. } => {
                self.event_additional
                    .insert(kind, self.current_additional.clone());
                if kind == EventKind::Blink {
                    self.blinking = true;
                }
            }
            Record::EventStop {
                kind,
                eye,
                onset,
                offset,
            } => {
                let mut columns = self.event_additional.remove(&kind).unwrap_or_default();
                columns.insert("eye".to_string(), Value::from(eye.as_str()));
                self.events
                    .push(&kind.event_name(), onset, offset, &columns);
                if kind == EventKind::Blink {
                    let period = self.sample_period();
                    self.collected.accounting.blinks.push(BlinkInterval {
                        onset,
                        offset,
                        period,
                    });
                    self.blinking = false;
                }
            }
            Record::RecordingConfig(config) => self.collected.recording_config.push(config),
            Record::GazeCoords { width, height } => {
                match self.collected.recording_config.last_mut() {
                    Some(config) => config.resolution = Some((width, height)),
                    None => debug!("GAZE_COORDS before any RECCFG, ignoring"),
                }
            }
            Record::RecordingStart { timestamp } => self.recording_start = Some(timestamp),
            Record::RecordingStop { timestamp } => match self.recording_start.take() {
                None => raise(
                    &mut self.collected.warnings,
                    ParseWarning::EndWithoutStart { timestamp },
                ),
                Some(start) => {
                    let duration = timestamp - start;
                    let accounting = &mut self.collected.accounting;
                    accounting.total_recording_duration_ms += duration;
                    if let Some(config) = self.collected.recording_config.last() {
                        accounting.num_expected_samples +=
                            metadata::expected_samples(duration, config.sampling_rate);
                    }
                }
            },
            Record::Sample(row) => {
                if !self.blinking && row.is_complete() {
                    self.collected.accounting.num_valid_samples += 1;
                }
                self.samples
                    .push(row.time, &row.values, &self.current_additional);
            }
            Record::CalibrationTimestamp { timestamp } => {
                self.pending_calibration = Some(timestamp)
            }
            Record::Validation(validation) => self.collected.validations.push(validation),
        }
    }

    /// Apply every not-yet-matched metadata pattern that matches `line`, in
    /// order. A pattern fires once and is never tried again.
    fn match_metadata(&mut self, line: &str) {
        let (matched, unmatched): (Vec<_>, Vec<_>) = std::mem::take(&mut self.unmatched_metadata)
            .into_iter()
            .partition(|p| p.is_match(line));
        self.unmatched_metadata = unmatched;
        for pattern in matched {
            pattern.apply(line, &mut self.raw_metadata);
            self.matched_metadata.push(pattern);
        }
    }

    fn finish(
        mut self,
        samples_config: Vec<SamplesConfig>,
        schema: &BTreeMap<String, DataType>,
    ) -> Result<(Samples, Events, Metadata), AscParserError> {
        if self.matched_metadata.is_empty() {
            raise(&mut self.collected.warnings, ParseWarning::NoMetadata);
        }
        if self.recording_start.is_some() {
            debug!("Recording block without END at end of input");
        }
        debug!(
            "Matched {} metadata patterns, {} unmatched",
            self.matched_metadata.len(),
            self.unmatched_metadata.len()
        );

        self.collected.raw = self.raw_metadata;
        self.collected.samples_config = samples_config;
        let metadata = Metadata::finalize(self.collected);

        self.samples.cast(schema)?;
        self.events.cast(schema)?;
        Ok((self.samples, self.events, metadata))
    }
}

/// Parse ASC text into samples, events and metadata.
pub fn parse_eyelink_str(
    text: &str,
    options: &ParseOptions,
) -> Result<(Samples, Events, Metadata), AscParserError> {
    let column_patterns = compile_patterns(&options.patterns, PatternField::Column)?;
    let metadata_patterns = compile_patterns(&options.metadata_patterns, PatternField::Key)?;

    let samples_config: Vec<SamplesConfig> = text
        .lines()
        .filter_map(|line| line.parse::<SamplesConfig>().ok())
        .collect();
    let layout = match samples_config.first() {
        Some(config) if config.is_binocular() => EyeLayout::Binocular,
        _ => EyeLayout::Monocular,
    };
    debug!("Sample layout: {:?}", layout);

    let mut state = ParserState::new(layout, &column_patterns, metadata_patterns);
    for line in text.lines() {
        state.step(line);
    }
    let (samples, events, metadata) = state.finish(samples_config, &options.schema)?;
    info!(
        "Parsed {} samples and {} events ({} warnings)",
        samples.len(),
        events.len(),
        metadata.warnings.len()
    );
    Ok((samples, events, metadata))
}

fn decode(bytes: &[u8], label: Option<&str>) -> Result<String, AscParserError> {
    let encoding = match label {
        None => encoding_rs::UTF_8,
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or_else(|| AscParserError::UnknownEncoding(label.to_string()))?,
    };
    match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => Ok(text.into_owned()),
        None => Err(AscParserError::Decode(encoding.name())),
    }
}

/// Parse ASC data read from `reader`, decoded with `options.encoding`.
pub fn parse_eyelink_reader<R: Read>(
    mut reader: R,
    options: &ParseOptions,
) -> Result<(Samples, Events, Metadata), AscParserError> {
    let mut bytes = vec![];
    reader.read_to_end(&mut bytes)?;
    let text = decode(&bytes, options.encoding.as_deref())?;
    parse_eyelink_str(&text, options)
}

/// Parse an ASC file into samples, events and metadata.
pub fn parse_eyelink<P: AsRef<Path>>(
    path: P,
    options: &ParseOptions,
) -> Result<(Samples, Events, Metadata), AscParserError> {
    let f = File::open(path.as_ref())?;
    debug!("Parsing {}", path.as_ref().display());
    parse_eyelink_reader(BufReader::new(f), options)
}
