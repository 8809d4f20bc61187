//! File loading and result export, kept outside the computational core

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::TraceResult;
use crate::pipeline::TraceOutput;
use crate::types::RawSeries;

/// Either a bare `[[...], ...]` table or `{"samples": [[...], ...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum SampleFile {
    Table(Vec<Vec<f64>>),
    Wrapped { samples: Vec<Vec<f64>> },
}

impl SampleFile {
    fn into_rows(self) -> Vec<Vec<f64>> {
        match self {
            SampleFile::Table(rows) | SampleFile::Wrapped { samples: rows } => rows,
        }
    }
}

fn open_reader(path: &Path) -> TraceResult<Box<dyn Read>> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Load and validate a 10-column sample table from `.json` or `.json.gz`
pub fn load_samples(path: &Path) -> TraceResult<RawSeries> {
    let parsed: SampleFile = serde_json::from_reader(open_reader(path)?)?;
    let rows = parsed.into_rows();
    log::debug!("loaded {} rows from {}", rows.len(), path.display());
    RawSeries::from_rows(&rows)
}

/// `[[x, y, z], ...]` rows of an (N, k) array
pub fn array_rows(array: &Array2<f64>) -> Vec<Vec<f64>> {
    array.rows().into_iter().map(|row| row.to_vec()).collect()
}

/// Write positions as a JSON array of `[x, y, z]` rows
pub fn write_positions(path: &Path, position: &Array2<f64>) -> TraceResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(writer, &array_rows(position))?;
    Ok(())
}

/// Headline numbers of one run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub samples: usize,
    pub duration_secs: f64,
    pub moving_periods: usize,
    pub moving_samples: usize,
    pub final_position: [f64; 3],
    /// Sum of step lengths along the trajectory [m]
    pub path_length: f64,
}

impl TraceSummary {
    pub fn from_output(output: &TraceOutput) -> Self {
        let n = output.len();
        let duration_secs = match n {
            0 => 0.0,
            _ => output.timestamps[n - 1] - output.timestamps[0],
        };

        let mut final_position = [0.0; 3];
        if n > 0 {
            for (axis, value) in final_position.iter_mut().enumerate() {
                *value = output.position[[n - 1, axis]];
            }
        }

        let path_length = output
            .position
            .rows()
            .into_iter()
            .zip(output.position.rows().into_iter().skip(1))
            .map(|(a, b)| (&b - &a).mapv(|d| d * d).sum().sqrt())
            .sum::<f64>();

        Self {
            samples: n,
            duration_secs,
            moving_periods: output.moving_periods.len(),
            moving_samples: output.is_moving.iter().filter(|&&m| m).count(),
            final_position,
            path_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraceConfig;
    use crate::error::TraceError;
    use crate::pipeline::PositionTracer;
    use approx::assert_abs_diff_eq;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use ndarray::{arr1, arr2};
    use std::io::Write;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("zupt_trace_{}_{}", std::process::id(), name))
    }

    fn rest_rows(n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let mut row = vec![0.0; 10];
                row[0] = i as f64 * 2.5;
                row[3] = 1.0;
                row
            })
            .collect()
    }

    #[test]
    fn test_load_plain_json() {
        let path = temp_path("plain.json");
        std::fs::write(&path, serde_json::to_string(&rest_rows(20)).unwrap()).unwrap();
        let raw = load_samples(&path).unwrap();
        assert_eq!(raw.len(), 20);
        assert_eq!(raw.timestamp_ms[19], 47.5);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_wrapped_gzip() {
        let path = temp_path("wrapped.json.gz");
        let body = serde_json::json!({ "samples": rest_rows(12) }).to_string();
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(body.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let raw = load_samples(&path).unwrap();
        assert_eq!(raw.len(), 12);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_short_rows() {
        let path = temp_path("short.json");
        std::fs::write(&path, "[[0, 1, 2], [1, 2, 3]]").unwrap();
        assert!(matches!(
            load_samples(&path),
            Err(TraceError::ColumnCount { row: 0, found: 3, .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            load_samples(&temp_path("does_not_exist.json")),
            Err(TraceError::Io(_))
        ));
    }

    #[test]
    fn test_write_positions() {
        let path = temp_path("positions.json");
        let position = arr2(&[[0.0, 0.0, 0.0], [0.5, -1.0, 2.0]]);
        write_positions(&path, &position).unwrap();
        let back: Vec<Vec<f64>> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, vec![vec![0.0, 0.0, 0.0], vec![0.5, -1.0, 2.0]]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_summary_at_rest() {
        let raw = RawSeries::from_rows(&rest_rows(400)).unwrap();
        let output = PositionTracer::new(TraceConfig::default())
            .unwrap()
            .trace(&raw)
            .unwrap();
        let summary = TraceSummary::from_output(&output);
        assert_eq!(summary.samples, 400);
        assert_abs_diff_eq!(summary.duration_secs, 0.9975, epsilon = 1e-12);
        assert_eq!(summary.moving_periods, 0);
        assert_eq!(summary.final_position, [0.0; 3]);
        assert_eq!(summary.path_length, 0.0);
    }

    #[test]
    fn test_summary_path_length() {
        let raw = RawSeries::from_rows(&rest_rows(3)).unwrap();
        let mut output = PositionTracer::new(TraceConfig::default())
            .unwrap()
            .trace(&raw)
            .unwrap();
        output.position = arr2(&[[0.0, 0.0, 0.0], [3.0, 4.0, 0.0], [3.0, 4.0, 1.0]]);
        output.timestamps = arr1(&[0.0, 1.0, 2.0]);
        let summary = TraceSummary::from_output(&output);
        assert_abs_diff_eq!(summary.path_length, 6.0, epsilon = 1e-12);
        assert_eq!(summary.final_position, [3.0, 4.0, 1.0]);
    }
}
