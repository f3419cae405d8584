// Error types for the neurovex signal pipeline
//
// This module defines custom error types for sample validation and pipeline
// lifecycle operations, providing structured error handling with stable error
// codes that presentation layers can match on.

mod pipeline;
mod sample;

pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};
pub use sample::{log_sample_error, SampleError, SampleErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the library and CLI boundary.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
