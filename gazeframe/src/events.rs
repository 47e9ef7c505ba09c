use std::collections::{BTreeMap, BTreeSet};

use crate::value::cast_column;
use crate::{DataType, FrameError, TimeColumn, Value};

/// A borrowed view of one event row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRow<'a> {
    pub index: usize,
    pub name: &'a str,
    pub onset: f64,
    pub offset: f64,
}

impl EventRow<'_> {
    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }
}

/// Events table: `name`, inclusive `onset`/`offset`, and additional
/// loosely-typed columns (eye, trial identifiers, pattern-extracted values).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Events {
    name: Vec<String>,
    onset: TimeColumn,
    offset: TimeColumn,
    columns: BTreeMap<String, Vec<Value>>,
}

impl Events {
    /// Build events sharing one `name` from onset and offset lists.
    ///
    /// Integer onsets/offsets stay integers. If only one of the two lists is
    /// floating point, both are stored as floats.
    pub fn new<T, U>(name: &str, onsets: T, offsets: U) -> Result<Events, FrameError>
    where
        T: Into<TimeColumn>,
        U: Into<TimeColumn>,
    {
        let mut onset = onsets.into();
        let mut offset = offsets.into();
        if onset.len() != offset.len() {
            return Err(FrameError::LengthMismatch {
                column: "offset".into(),
                expected: onset.len(),
                found: offset.len(),
            });
        }
        if onset.is_int() != offset.is_int() {
            onset = TimeColumn::Float(onset.to_f64());
            offset = TimeColumn::Float(offset.to_f64());
        }
        Ok(Events {
            name: vec![name.to_string(); onset.len()],
            onset,
            offset,
            columns: BTreeMap::new(),
        })
    }

    /// An empty table with float timestamps and the given additional columns.
    pub fn with_columns<I, S>(columns: I) -> Events
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Events {
            columns: columns.into_iter().map(|c| (c.into(), vec![])).collect(),
            ..Events::default()
        }
    }

    /// Append one row. Additional columns missing from `columns` are null;
    /// entries naming unknown columns are ignored.
    pub fn push(&mut self, name: &str, onset: f64, offset: f64, columns: &BTreeMap<String, Value>) {
        self.name.push(name.to_string());
        self.onset.push(onset);
        self.offset.push(offset);
        for (column_name, column) in self.columns.iter_mut() {
            column.push(columns.get(column_name).cloned().unwrap_or_default());
        }
    }

    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.name
    }

    pub fn onsets(&self) -> &TimeColumn {
        &self.onset
    }

    pub fn offsets(&self) -> &TimeColumn {
        &self.offset
    }

    /// `offset - onset` for every row.
    pub fn duration(&self) -> TimeColumn {
        self.offset.sub(&self.onset)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(|c| c.as_slice())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

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

    /// Add or replace `name` with `value` repeated on every row.
    pub fn fill_column(&mut self, name: &str, value: Value) {
        self.columns
            .insert(name.to_string(), vec![value; self.len()]);
    }

    pub fn rows(&self) -> impl Iterator<Item = EventRow<'_>> + '_ {
        (0..self.len()).map(move |i| self.row(i))
    }

    pub fn row(&self, index: usize) -> EventRow<'_> {
        EventRow {
            index,
            name: &self.name[index],
            onset: self.onset.get(index),
            offset: self.offset.get(index),
        }
    }

    /// A new table holding the rows at `indices`, in that order.
    pub fn take(&self, indices: &[usize]) -> Events {
        Events {
            name: indices.iter().map(|&i| self.name[i].clone()).collect(),
            onset: self.onset.take(indices),
            offset: self.offset.take(indices),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), indices.iter().map(|&i| v[i].clone()).collect()))
                .collect(),
        }
    }

    /// Rows for which `predicate` holds.
    pub fn filter<F>(&self, mut predicate: F) -> Events
    where
        F: FnMut(&EventRow<'_>) -> bool,
    {
        let indices: Vec<usize> = self
            .rows()
            .filter(|row| predicate(row))
            .map(|row| row.index)
            .collect();
        self.take(&indices)
    }

    /// Stable sort by onset.
    pub fn sort_by_onset(&mut self) {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by(|&a, &b| self.onset.get(a).total_cmp(&self.onset.get(b)));
        *self = self.take(&indices);
    }

    /// Vertically concatenate tables. Columns missing from some tables are
    /// null-filled; timestamps stay integers only if every table has integer
    /// timestamps.
    pub fn concat(frames: &[Events]) -> Events {
        let names: BTreeSet<&String> = frames.iter().flat_map(|f| f.columns.keys()).collect();
        let mut out = Events::with_columns(names.into_iter().cloned());
        if let Some(first) = frames.iter().find(|f| !f.is_empty()) {
            out.onset = first.onset.empty_like();
            out.offset = first.offset.empty_like();
        }

        for frame in frames {
            out.name.extend_from_slice(&frame.name);
            out.onset.extend(&frame.onset);
            out.offset.extend(&frame.offset);
            for (name, column) in out.columns.iter_mut() {
                match frame.columns.get(name) {
                    Some(values) => column.extend_from_slice(values),
                    None => column.extend(std::iter::repeat(Value::Null).take(frame.len())),
                }
            }
        }
        out
    }

    /// Apply a schema override to the additional columns.
    pub fn cast(&mut self, schema: &BTreeMap<String, DataType>) -> Result<(), FrameError> {
        for (name, to) in schema {
            if let Some(column) = self.columns.get_mut(name) {
                cast_column(name, column, *to)?;
            }
        }
        Ok(())
    }
}
