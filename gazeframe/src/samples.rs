use std::collections::{BTreeMap, HashMap};

use crate::value::cast_column;
use crate::{DataType, FrameError, Value};

pub const MONOCULAR_CHANNELS: [&str; 3] = ["x_pix", "y_pix", "pupil"];
pub const BINOCULAR_CHANNELS: [&str; 6] = [
    "x_left_pix",
    "y_left_pix",
    "pupil_left",
    "x_right_pix",
    "y_right_pix",
    "pupil_right",
];

/// Column layout of a samples table. Fixed once per recording.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EyeLayout {
    Monocular,
    Binocular,
}

impl EyeLayout {
    pub fn channels(self) -> &'static [&'static str] {
        match self {
            EyeLayout::Monocular => &MONOCULAR_CHANNELS,
            EyeLayout::Binocular => &BINOCULAR_CHANNELS,
        }
    }

    /// Indices into [`EyeLayout::channels`] of the pixel coordinates, as
    /// `x, y` pairs ordered left eye first.
    pub fn pixel_channels(self) -> &'static [usize] {
        match self {
            EyeLayout::Monocular => &[0, 1],
            EyeLayout::Binocular => &[0, 1, 3, 4],
        }
    }
}

/// Row indices sharing one combination of partition-column values.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub key: Vec<Value>,
    pub indices: Vec<usize>,
}

/// Gaze samples: a float time column, the layout's numeric channels (missing
/// values are NaN), and additional loosely-typed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    layout: EyeLayout,
    time: Vec<f64>,
    channels: Vec<Vec<f64>>,
    columns: BTreeMap<String, Vec<Value>>,
}

impl Samples {
    pub fn new<I, S>(layout: EyeLayout, additional: I) -> Samples
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Samples {
            layout,
            time: vec![],
            channels: vec![vec![]; layout.channels().len()],
            columns: additional.into_iter().map(|c| (c.into(), vec![])).collect(),
        }
    }

    /// Append one row.
    ///
    /// `values` holds one entry per channel of the layout. Additional columns
    /// missing from `additional` are filled with [`Value::Null`].
    pub fn push(&mut self, time: f64, values: &[f64], additional: &BTreeMap<String, Value>) {
        debug_assert_eq!(values.len(), self.channels.len());
        self.time.push(time);
        for (channel, v) in self.channels.iter_mut().zip(values) {
            channel.push(*v);
        }
        for (name, column) in self.columns.iter_mut() {
            column.push(additional.get(name).cloned().unwrap_or_default());
        }
    }

    pub fn layout(&self) -> EyeLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// A numeric channel by name, e.g. `x_pix` or `pupil_right`.
    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.layout
            .channels()
            .iter()
            .position(|c| *c == name)
            .map(|i| self.channels[i].as_slice())
    }

    pub fn channel_at(&self, idx: usize) -> &[f64] {
        &self.channels[idx]
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Add or replace an additional column.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), FrameError> {
        if values.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                column: name.to_string(),
                expected: self.len(),
                found: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Apply a schema override to the additional columns. Entries naming
    /// columns this table does not have are ignored.
    pub fn cast(&mut self, schema: &BTreeMap<String, DataType>) -> Result<(), FrameError> {
        for (name, to) in schema {
            if let Some(column) = self.columns.get_mut(name) {
                cast_column(name, column, *to)?;
            }
        }
        Ok(())
    }

    /// Group row indices by the values of `by`, in order of first appearance.
    ///
    /// With no partition columns the whole table is a single partition.
    pub fn partition_by(&self, by: &[String]) -> Result<Vec<Partition>, FrameError> {
        if by.is_empty() {
            return Ok(vec![Partition {
                key: vec![],
                indices: (0..self.len()).collect(),
            }]);
        }

        let columns = by
            .iter()
            .map(|name| {
                self.column(name)
                    .ok_or_else(|| FrameError::ColumnNotFound(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut partitions: Vec<Partition> = vec![];
        let mut lookup: HashMap<Vec<Value>, usize> = HashMap::new();
        for row in 0..self.len() {
            let key: Vec<Value> = columns.iter().map(|c| c[row].clone()).collect();
            match lookup.get(&key) {
                Some(&p) => partitions[p].indices.push(row),
                None => {
                    lookup.insert(key.clone(), partitions.len());
                    partitions.push(Partition {
                        key,
                        indices: vec![row],
                    });
                }
            }
        }
        Ok(partitions)
    }
}
