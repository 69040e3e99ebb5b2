//! Errors shared by the analysis and extraction pipeline.

use crate::{engine::EngineError, wav::WavError};
use std::{error::Error as StdError, io::Error as IoError, path::PathBuf};
use thiserror::Error;

/// Errors produced while analyzing or extracting files.
#[derive(Debug, Error)]
pub enum Error {
    /// A file could not be read or written.
    #[error("I/O error on {}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: IoError,
    },

    /// The sound engine rejected a request.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A sub-sound could not be exported.
    #[error("failed to export {}", output.display())]
    Wav {
        /// The file being written.
        output: PathBuf,
        /// The underlying error.
        #[source]
        source: WavError,
    },

    /// The input is neither a `.bank` nor an `.fsb` file.
    #[error("unsupported input file: {}", .0.display())]
    UnsupportedInput(PathBuf),

    /// The worker pool could not be created.
    #[error("failed to create worker pool")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(IoError) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Formats an error and all of its sources as `outer: inner: ...`.
pub(crate) fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(e) = source {
        message.push_str(": ");
        message.push_str(&e.to_string());
        source = e.source();
    }

    message
}

#[cfg(test)]
mod test {
    use super::{error_chain, Error};
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn chain_includes_sources() {
        let error = Error::io("a.bank")(IoError::new(ErrorKind::NotFound, "missing"));

        assert_eq!(error_chain(&error), "I/O error on a.bank: missing");
    }
}
