//! Fixed-capacity ring buffer of samples with streaming aggregates.
//!
//! Every collector keeps its history in a [`Series`]. Index 0 is always the
//! oldest retained sample and `len() - 1` the newest, regardless of where the
//! write cursor currently sits in the backing array.

/// Error returned by checked accessors.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// Requested index is not in `0..len`.
    OutOfRange { index: usize, len: usize },
}

impl std::fmt::Display for SeriesError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesError::OutOfRange { index, len } => {
                write!(f, "index {} out of range for series of length {}", index, len)
            }
        }
    }
}

impl std::error::Error for SeriesError {}

/// Bounded rolling history of `f64` samples.
///
/// `sum` is maintained exactly on every push. `min` and `max` only ever
/// widen on push; they are recomputed from the retained samples when the
/// write cursor wraps back to zero on a full buffer (and on `resize`). An
/// evicted extremum can therefore linger for at most one revolution.
#[derive(Debug, Clone)]
pub struct Series {
    values: Vec<f64>,
    len: usize,
    cursor: usize,
    min: f64,
    max: f64,
    sum: f64,
}

impl Series {
    /// Creates an empty series holding at most `capacity` samples.
    ///
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            len: 0,
            cursor: 0,
            min: f64::MAX,
            max: f64::MIN,
            sum: 0.0,
        }
    }

    /// Appends a sample, evicting the oldest one once the series is full.
    pub fn push(&mut self, value: f64) {
        let capacity = self.capacity();

        if self.len == capacity {
            self.sum -= self.values[self.cursor];
        }

        self.values[self.cursor] = value;
        self.sum += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        self.cursor = (self.cursor + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }

        if self.cursor == 0 && self.len == capacity {
            self.recompute();
        }
    }

    /// Changes the capacity, keeping the most recent `min(len, new_capacity)`
    /// samples in order.
    ///
    /// A capacity of 0 is ignored and resizing to the current capacity is a
    /// no-op.
    pub fn resize(&mut self, new_capacity: usize) {
        if new_capacity == 0 || new_capacity == self.capacity() {
            return;
        }

        let keep = self.len.min(new_capacity);
        let mut values = Vec::with_capacity(new_capacity);
        values.extend(self.iter().skip(self.len - keep));
        values.resize(new_capacity, 0.0);

        self.values = values;
        self.len = keep;
        self.cursor = keep % new_capacity;
        self.recompute();
    }

    /// Removes all samples, keeping the capacity.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.len = 0;
        self.cursor = 0;
        self.min = f64::MAX;
        self.max = f64::MIN;
        self.sum = 0.0;
    }

    /// Returns the sample at `index` (0 = oldest).
    pub fn value_at(&self, index: usize) -> Result<f64, SeriesError> {
        self.get(index).ok_or(SeriesError::OutOfRange {
            index,
            len: self.len,
        })
    }

    /// Returns the sample at `index` (0 = oldest), if present.
    pub fn get(&self, index: usize) -> Option<f64> {
        (index < self.len).then(|| self.values[self.physical(index)])
    }

    /// Like [`Series::get`] but returns 0.0 for an out-of-range index.
    pub fn value_or_zero(&self, index: usize) -> f64 {
        self.get(index).unwrap_or(0.0)
    }

    /// Most recently pushed sample, or 0.0 when empty.
    pub fn latest(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let capacity = self.capacity();
        self.values[(self.cursor + capacity - 1) % capacity]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Smallest retained sample (may lag by one revolution), 0.0 when empty.
    pub fn min(&self) -> f64 {
        if self.len == 0 { 0.0 } else { self.min }
    }

    /// Largest retained sample (may lag by one revolution), 0.0 when empty.
    pub fn max(&self) -> f64 {
        if self.len == 0 { 0.0 } else { self.max }
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of the retained samples, 0.0 when empty.
    pub fn average(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.sum / self.len as f64
    }

    /// Iterates samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |i| self.values[self.physical(i)])
    }

    /// Copies up to `dest.len()` samples, oldest first. Returns how many were copied.
    pub fn copy_into(&self, dest: &mut [f64]) -> usize {
        let mut copied = 0;
        for (slot, value) in dest.iter_mut().zip(self.iter()) {
            *slot = value;
            copied += 1;
        }
        copied
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }

    fn physical(&self, index: usize) -> usize {
        let capacity = self.capacity();
        (self.cursor + capacity - self.len + index) % capacity
    }

    fn recompute(&mut self) {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        let mut sum = 0.0;
        for value in self.iter() {
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }
        self.min = min;
        self.max = max;
        self.sum = sum;
    }
}
