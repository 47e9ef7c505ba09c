//! Event detection for eye-tracking recordings.
//!
//! The [`detection`] module holds the detectors as pure functions over
//! position or velocity series: dispersion-threshold ([`detection::idt`]) and
//! velocity-threshold ([`detection::ivt`]) fixation detection, microsaccade
//! detection ([`detection::microsaccades`]) and gap filling
//! ([`detection::fill`]). [`Gaze`] couples a samples table with its events and
//! runs detectors trial by trial.
#![forbid(unsafe_code)]

pub mod config;
pub mod detection;
mod gaze;

pub use detection::{DetectionError, DetectionMethod, EyeSelector};
pub use gaze::{Gaze, GazeError};
