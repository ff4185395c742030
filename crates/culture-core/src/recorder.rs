//! Time-series recorder for the per-tick metrics.
//!
//! Three parallel series are kept, one value per tick:
//!
//! | Label      | Value                                         |
//! |------------|-----------------------------------------------|
//! | `distance` | grid average feature distance                 |
//! | `change`   | trait exchanges in the tick divided by width  |
//! | `unique`   | number of distinct cultures on the grid       |
//!
//! The recorder is write-only during a run. At shutdown it is flushed once
//! to a comma-separated file with one row per series, label first.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

/// Label of the average feature distance series.
pub const DISTANCE_LABEL: &str = "distance";

/// Label of the exchange count series.
pub const CHANGE_LABEL: &str = "change";

/// Label of the unique culture count series.
pub const UNIQUE_LABEL: &str = "unique";

/// Errors that can occur when flushing recorded data.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The output directory could not be created.
    #[error("failed creating directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// The output file could not be created.
    #[error("failed creating file {path}: {source}")]
    CreateFile {
        /// File that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Writing the rows failed.
    #[error("failed writing {path}: {source}")]
    Write {
        /// File being written.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// Metrics captured at the end of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSample {
    /// Grid average feature distance.
    pub avg_distance: u64,
    /// Exchanges in the tick, integer-divided by grid width.
    pub changes: u64,
    /// Distinct culture values on the grid.
    pub unique: u64,
}

/// One labelled series of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSeries {
    /// Row label written before the values.
    pub label: &'static str,
    /// One value per recorded tick.
    pub values: Vec<u64>,
}

impl MetricSeries {
    const fn new(label: &'static str) -> Self {
        Self {
            label,
            values: Vec::new(),
        }
    }
}

/// Accumulates [`MetricSample`]s into three parallel series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesRecorder {
    distance: MetricSeries,
    change: MetricSeries,
    unique: MetricSeries,
}

impl Default for TimeSeriesRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesRecorder {
    /// Create an empty recorder with the three labelled series.
    pub const fn new() -> Self {
        Self {
            distance: MetricSeries::new(DISTANCE_LABEL),
            change: MetricSeries::new(CHANGE_LABEL),
            unique: MetricSeries::new(UNIQUE_LABEL),
        }
    }

    /// Drop all recorded values, keeping the labels.
    pub fn reset(&mut self) {
        self.distance.values.clear();
        self.change.values.clear();
        self.unique.values.clear();
    }

    /// Append one tick's metrics.
    pub fn record(&mut self, sample: MetricSample) {
        self.distance.values.push(sample.avg_distance);
        self.change.values.push(sample.changes);
        self.unique.values.push(sample.unique);
    }

    /// Number of ticks recorded.
    pub fn len(&self) -> usize {
        self.distance.values.len()
    }

    /// Whether no tick has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.distance.values.is_empty()
    }

    /// The three series in output order.
    pub const fn series(&self) -> [&MetricSeries; 3] {
        [&self.distance, &self.change, &self.unique]
    }

    /// The most recent sample, if any.
    pub fn last(&self) -> Option<MetricSample> {
        Some(MetricSample {
            avg_distance: *self.distance.values.last()?,
            changes: *self.change.values.last()?,
            unique: *self.unique.values.last()?,
        })
    }

    /// Rows as text fields: label followed by one value per tick.
    pub fn rows(&self) -> Vec<Vec<String>> {
        self.series()
            .iter()
            .map(|s| {
                std::iter::once(s.label.to_owned())
                    .chain(s.values.iter().map(u64::to_string))
                    .collect()
            })
            .collect()
    }

    /// Write the three rows as comma-separated values.
    ///
    /// # Errors
    ///
    /// Propagates any I/O error from `writer`.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for row in self.rows() {
            let line = row
                .iter()
                .map(|field| escape_field(field))
                .collect::<Vec<_>>()
                .join(",");
            writeln!(writer, "{line}")?;
        }
        writer.flush()
    }

    /// Write the rows to `dir/file_name`, creating `dir` if needed and
    /// overwriting any existing file. Returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError`] if the directory or file cannot be created
    /// or written. No retry is attempted.
    pub fn flush_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf, RecorderError> {
        fs::create_dir_all(dir).map_err(|source| RecorderError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(file_name);
        let file = File::create(&path).map_err(|source| RecorderError::CreateFile {
            path: path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        self.write_csv(&mut writer)
            .map_err(|source| RecorderError::Write {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), ticks = self.len(), "Simulation data saved");
        Ok(path)
    }
}

/// Deterministic output file name for a run's parameters.
///
/// Coverage is rendered with one decimal, e.g. `log-n100-w50-c1.0.csv`.
pub fn log_file_name(interactions: u32, width: usize, coverage: f64) -> String {
    format!("log-n{interactions}-w{width}-c{coverage:.1}.csv")
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}
