//! Ingestion errors
//!
//! Every variant is fatal for the run that raised it: the pipeline returns no
//! partial records or entries.

use crate::acquisition::ParseError;
use crate::classifier::ClassifyError;
use std::string::FromUtf8Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error reading export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line} is not valid UTF-8: {source}")]
    Decode {
        line: usize,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("Ingestion cancelled")]
    Cancelled,
}
