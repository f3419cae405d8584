// Pipeline lifecycle error types and constants

use crate::error::{ErrorCode, SampleError};
use log::error;
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 2001-2005
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// A sample failed validation on its way into the pipeline
    pub const INVALID_SAMPLE: i32 = 2001;

    /// Streaming already running
    pub const ALREADY_RUNNING: i32 = 2002;

    /// Streaming not running
    pub const NOT_RUNNING: i32 = 2003;

    /// Pipeline mutex was poisoned
    pub const LOCK_POISONED: i32 = 2004;

    /// Source or worker thread could not be spawned
    pub const WORKER_SPAWN_FAILED: i32 = 2005;
}

/// Log a pipeline error with structured context
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=EngineHandle, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the engine handle and streaming machinery
///
/// Error code range: 2001-2005
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Sample rejected by validation
    InvalidSample(SampleError),

    /// Streaming is already running
    AlreadyRunning,

    /// Streaming is not running
    NotRunning,

    /// Mutex guarding the pipeline was poisoned
    LockPoisoned { component: String },

    /// Thread spawn failed
    WorkerSpawnFailed { reason: String },
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::InvalidSample(_) => PipelineErrorCodes::INVALID_SAMPLE,
            PipelineError::AlreadyRunning => PipelineErrorCodes::ALREADY_RUNNING,
            PipelineError::NotRunning => PipelineErrorCodes::NOT_RUNNING,
            PipelineError::LockPoisoned { .. } => PipelineErrorCodes::LOCK_POISONED,
            PipelineError::WorkerSpawnFailed { .. } => PipelineErrorCodes::WORKER_SPAWN_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::InvalidSample(inner) => format!("Invalid sample: {}", inner.message()),
            PipelineError::AlreadyRunning => {
                "Stream already running. Call stop_stream() first.".to_string()
            }
            PipelineError::NotRunning => {
                "Stream not running. Call start_stream() first.".to_string()
            }
            PipelineError::LockPoisoned { component } => {
                format!("Lock poisoned for component: {}", component)
            }
            PipelineError::WorkerSpawnFailed { reason } => {
                format!("Failed to spawn worker thread: {}", reason)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::InvalidSample(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<SampleError> for PipelineError {
    fn from(err: SampleError) -> Self {
        PipelineError::InvalidSample(err)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::WorkerSpawnFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_error_codes() {
        assert_eq!(
            PipelineError::InvalidSample(SampleError::QualityOutOfRange { quality: 2.0 }).code(),
            2001
        );
        assert_eq!(PipelineError::AlreadyRunning.code(), 2002);
        assert_eq!(PipelineError::NotRunning.code(), 2003);
        assert_eq!(
            PipelineError::LockPoisoned {
                component: "SignalPipeline".to_string()
            }
            .code(),
            2004
        );
        assert_eq!(
            PipelineError::WorkerSpawnFailed {
                reason: "test".to_string()
            }
            .code(),
            2005
        );
    }

    #[test]
    fn test_sample_error_conversion() {
        fn may_fail() -> Result<(), SampleError> {
            Err(SampleError::MissingBand {
                band: "theta".to_string(),
            })
        }

        fn caller() -> Result<(), PipelineError> {
            may_fail()?;
            Ok(())
        }

        match caller() {
            Err(PipelineError::InvalidSample(SampleError::MissingBand { band })) => {
                assert_eq!(band, "theta");
            }
            other => panic!("Expected InvalidSample, got {:?}", other),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "no threads left");
        let err: PipelineError = io_err.into();
        assert!(err.message().contains("no threads left"));
    }

    #[test]
    fn test_error_code_trait_object() {
        let err: &dyn ErrorCode = &PipelineError::NotRunning;
        assert_eq!(err.code(), PipelineErrorCodes::NOT_RUNNING);
    }
}
