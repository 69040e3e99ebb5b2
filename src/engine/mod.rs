//! The container engine: a single, serialized gateway to whatever can open sound containers.

pub(crate) mod error;
pub(crate) mod native;

use crate::model::{ContainerLocation, EventInfo, SubSoundDescriptor};
pub use error::{EngineError, EngineErrorKind};
pub use native::{dump_container, NativeBackend};
use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    io::Read,
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};
use tracing::{debug, info};

/// Identifies a bank loaded through [`SoundBackend::load_bank`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BankHandle(pub u64);

/// A library capable of opening sound containers.
///
/// Implementations need not be reentrant; [`ContainerEngine`] never calls into a backend from
/// more than one thread at a time.
pub trait SoundBackend: Send {
    /// Prepares the backend for use.
    ///
    /// # Errors
    /// Returns an error if the backend cannot run at all.
    fn init(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Releases everything acquired by [`init`](Self::init).
    fn shutdown(&mut self) {}

    /// Opens the container at `location` without decoding any audio.
    ///
    /// # Errors
    /// Returns an error if no valid container starts at the location.
    fn open(
        &mut self,
        location: &ContainerLocation,
    ) -> Result<Box<dyn OpenContainer + '_>, EngineError>;

    /// Loads a bank's logical (event) data.
    ///
    /// # Errors
    /// Returns [`EngineErrorKind::AlreadyLoaded`] if the bank was loaded before, or
    /// [`EngineErrorKind::Unsupported`] if the backend has no notion of logical banks.
    fn load_bank(&mut self, path: &Path) -> Result<BankHandle, EngineError> {
        let _ = path;
        Err(EngineError::new(EngineErrorKind::Unsupported))
    }

    /// Finds an already loaded bank by its file name.
    ///
    /// # Errors
    /// Returns an error if no loaded bank has that file name.
    fn find_loaded_bank(&mut self, file_name: &str) -> Result<BankHandle, EngineError> {
        let _ = file_name;
        Err(EngineError::new(EngineErrorKind::Unsupported))
    }

    /// Lists the logical events of a loaded bank.
    ///
    /// # Errors
    /// Returns an error if the bank's events cannot be enumerated.
    fn bank_events(&mut self, bank: BankHandle) -> Result<Vec<EventInfo>, EngineError> {
        let _ = bank;
        Err(EngineError::new(EngineErrorKind::Unsupported))
    }
}

/// A container opened by a [`SoundBackend`]. Dropping it closes the container.
pub trait OpenContainer {
    /// Name stored in the container itself, if the format has one.
    fn name(&self) -> Option<&str>;

    /// Number of sub-sounds in the container.
    fn sub_sound_count(&self) -> u32;

    /// Captures the properties of one sub-sound.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or the sub-sound cannot be inspected.
    fn describe(&mut self, index: u32) -> Result<SubSoundDescriptor, EngineError>;

    /// Streams the sub-sound's PCM sample bytes.
    ///
    /// # Errors
    /// Returns an error if `index` is out of range or its data cannot be streamed as PCM.
    fn open_sub_sound(&mut self, index: u32) -> Result<Box<dyn Read + '_>, EngineError>;
}

/// Owns a [`SoundBackend`] for its whole lifetime and serializes all access to it.
pub struct ContainerEngine {
    backend: Mutex<Box<dyn SoundBackend>>,
}

impl ContainerEngine {
    /// Initializes `backend` and wraps it.
    ///
    /// # Errors
    /// Returns an error if the backend fails to initialize.
    pub fn start(mut backend: Box<dyn SoundBackend>) -> Result<Self, EngineError> {
        backend.init()?;
        info!("sound engine started");

        Ok(Self {
            backend: Mutex::new(backend),
        })
    }

    /// Starts an engine backed by the built-in FSB5 parser.
    ///
    /// # Errors
    /// Returns an error if the backend fails to initialize.
    pub fn native() -> Result<Self, EngineError> {
        Self::start(Box::new(NativeBackend::new()))
    }

    /// Opens the container at `location` and runs `f` on it while holding the engine.
    ///
    /// The container is closed before the engine is released.
    ///
    /// # Errors
    /// Returns an error if the container cannot be opened, or whatever `f` returns.
    pub fn with_container<T>(
        &self,
        location: &ContainerLocation,
        f: impl FnOnce(&mut dyn OpenContainer) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut backend = self.lock();
        let mut container = backend.open(location)?;
        debug!(%location, sub_sounds = container.sub_sound_count(), "opened container");

        f(&mut *container)
    }

    /// Runs `f` on the backend while holding the engine.
    pub fn with_backend<T>(&self, f: impl FnOnce(&mut dyn SoundBackend) -> T) -> T {
        let mut backend = self.lock();
        f(&mut **backend)
    }

    // a panic inside a transaction leaves no partial state behind in the guard itself
    fn lock(&self) -> MutexGuard<'_, Box<dyn SoundBackend>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ContainerEngine {
    fn drop(&mut self) {
        self.backend
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .shutdown();
        info!("sound engine shut down");
    }
}

impl Debug for ContainerEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ContainerEngine").finish_non_exhaustive()
    }
}
