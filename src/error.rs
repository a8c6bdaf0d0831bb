// src/error.rs

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The run-fatal failures of the counting pipeline. None of these are
/// retried: the pipeline releases its handles and aborts, leaving any
/// partially written output as-is.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open frame source")]
    SourceOpen(#[source] BoxError),

    #[error("failed to open frame sink")]
    SinkOpen(#[source] BoxError),

    #[error("failed to read frame {frame}")]
    FrameRead {
        frame: u64,
        #[source]
        source: BoxError,
    },

    #[error("failed to write frame {frame}")]
    FrameWrite {
        frame: u64,
        #[source]
        source: BoxError,
    },

    #[error("detector failed on frame {frame}")]
    Detector {
        frame: u64,
        #[source]
        source: BoxError,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
