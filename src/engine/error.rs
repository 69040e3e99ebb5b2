use crate::header::AudioFormat;
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
};

type BoxedSource = Box<dyn Error + Send + Sync + 'static>;

/// Represents an error reported by a sound backend.
#[derive(Debug)]
pub struct EngineError {
    kind: EngineErrorKind,
    source: Option<BoxedSource>,
}

/// Describes what went wrong inside a sound backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineErrorKind {
    /// The backend could not be started.
    Init,
    /// A container could not be opened at the requested location.
    Open,
    /// A sub-sound index was past the end of its container.
    SubSoundIndex {
        /// The requested index.
        index: u32,
        /// Number of sub-sounds in the container.
        count: u32,
    },
    /// The sub-sound's sample data cannot be streamed as PCM.
    UnsupportedEncoding {
        /// Encoding of the sub-sound.
        format: AudioFormat,
    },
    /// Sample data could not be read.
    Read,
    /// The backend does not offer the requested facility.
    Unsupported,
    /// The bank was loaded by an earlier request.
    AlreadyLoaded,
    /// No loaded bank matched the lookup.
    BankNotFound,
}

impl EngineError {
    /// Creates an error without an underlying cause.
    #[must_use]
    pub fn new(kind: EngineErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Creates an error caused by `source`.
    pub fn new_with_source(kind: EngineErrorKind, source: impl Into<BoxedSource>) -> Self {
        Self {
            kind,
            source: Some(source.into()),
        }
    }

    pub(crate) fn factory<E: Into<BoxedSource>>(kind: EngineErrorKind) -> impl FnOnce(E) -> Self {
        move |source| Self::new_with_source(kind, source)
    }

    /// Returns what went wrong.
    #[must_use]
    pub fn kind(&self) -> EngineErrorKind {
        self.kind
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        use EngineErrorKind::*;

        match self.kind {
            Init => f.write_str("failed to initialize sound engine"),
            Open => f.write_str("failed to open sound container"),
            SubSoundIndex { index, count } => f.write_str(&format!(
                "sub-sound index {index} is out of range for a container of {count} sub-sounds"
            )),
            UnsupportedEncoding { format } => {
                f.write_str(&format!("sample data encoded as {format} cannot be streamed as PCM"))
            }
            Read => f.write_str("failed to read sample data"),
            Unsupported => f.write_str("operation is not supported by this sound engine"),
            AlreadyLoaded => f.write_str("bank is already loaded"),
            BankNotFound => f.write_str("no loaded bank matched the requested file name"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            Some(e) => Some(&**e),
            None => None,
        }
    }
}
