// ReplaySource - plays back recorded samples from a JSON-lines file
//
// One RawSample object per line. Blank lines and lines starting with '#'
// are ignored. Lines that fail to parse or validate are either skipped with
// a warning or abort the load, depending on InvalidSamplePolicy.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::error::{log_sample_error, SampleError};
use crate::signal::{RawSample, Sample};
use crate::source::SampleSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvalidSamplePolicy {
    /// Log and drop the offending line
    #[default]
    Skip,
    /// Fail the whole load
    Abort,
}

pub struct ReplaySource {
    samples: VecDeque<Sample>,
    rate_hz: u32,
    skipped: usize,
}

impl ReplaySource {
    pub fn load<P: AsRef<Path>>(path: P, policy: InvalidSamplePolicy) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open recording {}", path.display()))?;
        Self::from_reader(BufReader::new(file), policy)
            .with_context(|| format!("failed to load recording {}", path.display()))
    }

    pub fn from_reader<R: BufRead>(reader: R, policy: InvalidSamplePolicy) -> Result<Self> {
        let mut samples = VecDeque::new();
        let mut skipped = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.with_context(|| format!("read error at line {}", line_no))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_line(trimmed) {
                Ok(sample) => samples.push_back(sample),
                Err(LineError::Json(err)) => match policy {
                    InvalidSamplePolicy::Skip => {
                        log::warn!("[ReplaySource] Skipping line {}: {}", line_no, err);
                        skipped += 1;
                    }
                    InvalidSamplePolicy::Abort => {
                        return Err(anyhow!("line {}: malformed sample: {}", line_no, err));
                    }
                },
                Err(LineError::Invalid(err)) => match policy {
                    InvalidSamplePolicy::Skip => {
                        log_sample_error(&err, "replay");
                        skipped += 1;
                    }
                    InvalidSamplePolicy::Abort => {
                        return Err(anyhow!("line {}: {}", line_no, err));
                    }
                },
            }
        }

        log::info!(
            "[ReplaySource] Loaded {} samples ({} skipped)",
            samples.len(),
            skipped
        );

        Ok(Self {
            samples,
            rate_hz: 32,
            skipped,
        })
    }

    /// Build a source from already-validated samples
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self {
            samples: samples.into(),
            rate_hz: 32,
            skipped: 0,
        }
    }

    pub fn with_rate(mut self, rate_hz: u32) -> Self {
        self.rate_hz = rate_hz.max(1);
        self
    }

    /// Samples still to be emitted
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }

    /// Lines dropped under `InvalidSamplePolicy::Skip`
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

enum LineError {
    Json(serde_json::Error),
    Invalid(SampleError),
}

fn parse_line(line: &str) -> std::result::Result<Sample, LineError> {
    let raw: RawSample = serde_json::from_str(line).map_err(LineError::Json)?;
    Sample::try_from(raw).map_err(LineError::Invalid)
}

impl Iterator for ReplaySource {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        self.samples.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.samples.len(), Some(self.samples.len()))
    }
}

impl SampleSource for ReplaySource {
    fn rate_hz(&self) -> u32 {
        self.rate_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const GOOD: &str = r#"{"timestamp_ms":0,"bands":{"delta":0.1,"theta":0.1,"alpha":0.05,"beta":0.25,"gamma":0.1},"quality":0.9}"#;
    const MISSING_BETA: &str = r#"{"timestamp_ms":31,"bands":{"delta":0.1,"theta":0.1,"alpha":0.05,"gamma":0.1},"quality":0.9}"#;

    #[test]
    fn test_loads_valid_lines() {
        let input = format!("{}\n\n# comment\n{}\n", GOOD, GOOD);
        let source = ReplaySource::from_reader(Cursor::new(input), InvalidSamplePolicy::Skip)
            .unwrap();
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.skipped(), 0);
    }

    #[test]
    fn test_skip_policy_drops_bad_lines() {
        let input = format!("{}\nnot json\n{}\n", GOOD, MISSING_BETA);
        let source = ReplaySource::from_reader(Cursor::new(input), InvalidSamplePolicy::Skip)
            .unwrap();
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.skipped(), 2);
    }

    #[test]
    fn test_abort_policy_reports_line() {
        let input = format!("{}\n{}\n", GOOD, MISSING_BETA);
        let err = ReplaySource::from_reader(Cursor::new(input), InvalidSamplePolicy::Abort)
            .err()
            .unwrap();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "unexpected error: {}", msg);
        assert!(msg.contains("beta"), "unexpected error: {}", msg);
    }

    #[test]
    fn test_timestamp_alias_accepted() {
        let line = r#"{"timestamp":5,"bands":{"delta":0.1,"theta":0.1,"alpha":0.1,"beta":0.1,"gamma":0.1},"quality":0.5}"#;
        let mut source =
            ReplaySource::from_reader(Cursor::new(line), InvalidSamplePolicy::Abort).unwrap();
        assert_eq!(source.next().unwrap().timestamp_ms, 5);
        assert!(source.next().is_none());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ReplaySource::load("/nonexistent/recording.jsonl", InvalidSamplePolicy::Skip)
            .is_err());
    }
}
