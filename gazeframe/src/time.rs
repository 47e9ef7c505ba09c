/// A column of timestamps.
///
/// Integer timestamps stay integers; a column only becomes `Float` when it is
/// constructed from floats or a non-integral value is pushed into it.
#[derive(Clone, Debug, PartialEq)]
pub enum TimeColumn {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl TimeColumn {
    /// Sample-index timesteps `0..n`.
    pub fn indices(n: usize) -> TimeColumn {
        TimeColumn::Int((0..n as i64).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            TimeColumn::Int(v) => v.len(),
            TimeColumn::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_int(&self) -> bool {
        matches!(self, TimeColumn::Int(_))
    }

    /// Value at `idx` as a float. Panics if out of bounds.
    pub fn get(&self, idx: usize) -> f64 {
        match self {
            TimeColumn::Int(v) => v[idx] as f64,
            TimeColumn::Float(v) => v[idx],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.iter().collect()
    }

    /// Gather the rows at `indices`, keeping the column type.
    pub fn take(&self, indices: &[usize]) -> TimeColumn {
        match self {
            TimeColumn::Int(v) => TimeColumn::Int(indices.iter().map(|&i| v[i]).collect()),
            TimeColumn::Float(v) => TimeColumn::Float(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    pub fn push(&mut self, t: f64) {
        if t.fract() != 0.0 || !t.is_finite() {
            self.promote();
        }
        match self {
            TimeColumn::Int(v) => v.push(t as i64),
            TimeColumn::Float(v) => v.push(t),
        }
    }

    /// Append `other`, promoting to `Float` unless both columns are `Int`.
    pub fn extend(&mut self, other: &TimeColumn) {
        if !other.is_int() {
            self.promote();
        }
        match self {
            TimeColumn::Int(a) => a.extend(other.iter().map(|t| t as i64)),
            TimeColumn::Float(a) => a.extend(other.iter()),
        }
    }

    fn promote(&mut self) {
        if let TimeColumn::Int(v) = self {
            let promoted = v.iter().map(|&i| i as f64).collect();
            *self = TimeColumn::Float(promoted);
        }
    }

    /// Element-wise `self - other`. Both columns must have the same length.
    pub fn sub(&self, other: &TimeColumn) -> TimeColumn {
        match (self, other) {
            (TimeColumn::Int(a), TimeColumn::Int(b)) => {
                TimeColumn::Int(a.iter().zip(b).map(|(x, y)| x - y).collect())
            }
            (a, b) => TimeColumn::Float(a.iter().zip(b.iter()).map(|(x, y)| x - y).collect()),
        }
    }

    pub(crate) fn empty_like(&self) -> TimeColumn {
        match self {
            TimeColumn::Int(_) => TimeColumn::Int(vec![]),
            TimeColumn::Float(_) => TimeColumn::Float(vec![]),
        }
    }
}

impl Default for TimeColumn {
    fn default() -> Self {
        TimeColumn::Float(vec![])
    }
}

impl From<Vec<i64>> for TimeColumn {
    fn from(v: Vec<i64>) -> Self {
        TimeColumn::Int(v)
    }
}

impl From<Vec<f64>> for TimeColumn {
    fn from(v: Vec<f64>) -> Self {
        TimeColumn::Float(v)
    }
}

impl From<&[f64]> for TimeColumn {
    fn from(v: &[f64]) -> Self {
        TimeColumn::Float(v.to_vec())
    }
}
