//! Error handling for the rdsrx library
//!
//! Everything in this crate is numeric processing over caller-supplied
//! buffers, so the only failures are bad construction parameters and output
//! buffers that are too small for the requested call.

use thiserror::Error;

/// A specialized Result type for rdsrx operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for rdsrx operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A filter, loop or resampler was built with parameters it cannot honour.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The output buffer cannot hold every sample the call would produce.
    #[error("Output buffer too small: {required} samples required, {available} available")]
    Capacity { required: usize, available: usize },
}

impl Error {
    /// Create an invalid-parameter error with a custom message
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::InvalidParameter(msg.into())
    }

    /// Fail with [`Error::Capacity`] unless `available >= required`.
    pub fn check_capacity(required: usize, available: usize) -> Result<()> {
        if available < required {
            return Err(Error::Capacity {
                required,
                available,
            });
        }
        Ok(())
    }
}
