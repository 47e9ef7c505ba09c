//! Columnar tables for eye-tracking data.
//!
//! [`Samples`] holds one row per gaze sample and [`Events`] one row per
//! behavioral interval (fixation, saccade, blink, ...). Both carry any number
//! of loosely-typed additional columns (see [`Value`]), which is how trial and
//! task identifiers travel alongside the data.
#![forbid(unsafe_code)]

use thiserror::Error;

mod events;
mod samples;
mod time;
mod value;

pub use events::{EventRow, Events};
pub use samples::{EyeLayout, Partition, Samples, BINOCULAR_CHANNELS, MONOCULAR_CHANNELS};
pub use time::TimeColumn;
pub use value::{DataType, Value};

#[derive(Error, Debug, PartialEq)]
pub enum FrameError {
    #[error("Column `{column}` has length {found}, expected {expected}.")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Column `{0}` not found.")]
    ColumnNotFound(String),
    #[error("Cannot cast `{value}` in column `{column}` to {to}.")]
    Cast {
        column: String,
        value: String,
        to: DataType,
    },
    #[error("Unknown data type `{0}`.")]
    UnknownDataType(String),
}
