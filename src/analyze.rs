//! Per-file analysis: finds containers, probes them and builds the file's result subtree.

use crate::{
    batch::StopFlag,
    engine::{ContainerEngine, EngineError, EngineErrorKind, OpenContainer},
    error::{error_chain, Error, Result},
    header::FSB5_MAGIC,
    model::{ContainerLocation, SubSoundDescriptor},
    naming::{sanitize_file_name, NameResolver},
    scan::scan,
    tree::{
        AnalysisNode, ContainerGroup, EventGroup, EventNode, FileRoot, NodeStatus, SubSoundLeaf,
    },
};
use std::{path::Path, result::Result as StdResult};
use tracing::{debug, info, warn};

/// Display name of the node holding a bank's logical events.
pub const EVENT_GROUP_NAME: &str = "Events";

/// Kinds of input the analyzer understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// An FMOD bank that may embed sound containers.
    Bank,
    /// A bank that only holds event names.
    StringsBank,
    /// A standalone sound container.
    Fsb,
}

impl InputKind {
    /// Classifies a path by its extension, ignoring case.
    #[must_use]
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();

        if name.ends_with(".strings.bank") {
            Some(Self::StringsBank)
        } else if name.ends_with(".bank") {
            Some(Self::Bank)
        } else if name.ends_with(".fsb") {
            Some(Self::Fsb)
        } else {
            None
        }
    }
}

// everything learned from one open+describe+close transaction
struct ProbedContainer {
    name: Option<String>,
    sounds: Vec<SubSoundDescriptor>,
}

/// Analyzes single files against a shared [`ContainerEngine`].
#[derive(Clone, Debug)]
pub struct BankAnalyzer<'e> {
    engine: &'e ContainerEngine,
    stop: StopFlag,
}

impl<'e> BankAnalyzer<'e> {
    /// Creates an analyzer that gives up early once `stop` is set.
    #[must_use]
    pub fn new(engine: &'e ContainerEngine, stop: StopFlag) -> Self {
        Self { engine, stop }
    }

    /// Analyzes one file. Failures are recorded in the returned node rather than returned.
    #[must_use]
    pub fn analyze(&self, path: &Path) -> AnalysisNode {
        let (status, children) = match self.analyze_children(path) {
            Ok(analyzed) => analyzed,
            Err(e) => {
                let reason = error_chain(&e);
                warn!(path = %path.display(), %reason, "analysis failed");
                (NodeStatus::Failed(reason), Vec::new())
            }
        };

        AnalysisNode::FileRoot(FileRoot {
            name: display_name(path),
            path: path.to_path_buf(),
            status,
            selected: true,
            children,
        })
    }

    /// Loads a strings bank so later banks can resolve event names.
    ///
    /// Loading a bank twice is not an error.
    pub fn load_strings_bank(&self, path: &Path) {
        let result = self.engine.with_backend(|backend| backend.load_bank(path));

        match result {
            Ok(_) => info!(path = %path.display(), "loaded strings bank"),
            Err(e) => match e.kind() {
                EngineErrorKind::AlreadyLoaded => {
                    debug!(path = %path.display(), "strings bank already loaded");
                }
                EngineErrorKind::Unsupported => {
                    debug!(path = %path.display(), "engine cannot load strings banks");
                }
                _ => warn!(
                    path = %path.display(),
                    reason = %error_chain(&e),
                    "failed to load strings bank"
                ),
            },
        }
    }

    fn analyze_children(&self, path: &Path) -> Result<(NodeStatus, Vec<AnalysisNode>)> {
        let stem = file_stem(path);

        match InputKind::of(path) {
            Some(InputKind::Fsb) => {
                let probed = self.probe(&ContainerLocation::new(path, 0))?;
                Ok((NodeStatus::Done, leaves(&stem, probed.sounds, true)))
            }
            Some(InputKind::Bank | InputKind::StringsBank) => self.analyze_bank(path, &stem),
            None => Err(Error::UnsupportedInput(path.to_path_buf())),
        }
    }

    fn analyze_bank(&self, path: &Path, stem: &str) -> Result<(NodeStatus, Vec<AnalysisNode>)> {
        let offsets = scan(path, FSB5_MAGIC).map_err(Error::io(path))?;
        let found = offsets.len();

        if found == 0 {
            debug!(path = %path.display(), "bank holds no sound containers");
            return Ok((NodeStatus::Done, Vec::new()));
        }

        let mut probes = Vec::with_capacity(found);
        for offset in offsets {
            if self.stop.is_set() {
                break;
            }

            let location = ContainerLocation::new(path, offset);
            let probed = self.probe(&location);
            if let Err(e) = &probed {
                debug!(%location, reason = %error_chain(e), "container rejected");
            }
            probes.push((location, probed));
        }

        let status = if probes.len() < found {
            info!(path = %path.display(), probed = probes.len(), found, "bank analysis stopped");
            NodeStatus::Stopped
        } else {
            NodeStatus::Done
        };

        let first_count = match probes.first() {
            Some((_, Ok(probed))) => probed.sounds.len() as u32,
            _ => 0,
        };

        let mut children = Vec::new();

        if NameResolver::is_inline(found, first_count) {
            debug!(path = %path.display(), sub_sounds = first_count, "flattening single container");
            if let Some((_, Ok(probed))) = probes.pop() {
                children = leaves(stem, probed.sounds, true);
            }
        } else {
            let names = NameResolver::new().container_names(
                stem,
                probes.iter().map(|(_, probed)| match probed {
                    Ok(probed) => probed.name.as_deref(),
                    Err(_) => None,
                }),
            );

            children.extend(probes.into_iter().zip(names).map(|((location, probed), name)| {
                let container_stem = name.strip_suffix(".fsb").unwrap_or(&name).to_owned();
                let (status, sounds) = match probed {
                    Ok(probed) => (NodeStatus::Done, leaves(&container_stem, probed.sounds, false)),
                    Err(e) => (NodeStatus::Failed(error_chain(&e)), Vec::new()),
                };

                AnalysisNode::ContainerGroup(ContainerGroup {
                    name,
                    location,
                    status,
                    selected: true,
                    children: sounds,
                })
            }));
        }

        if status == NodeStatus::Done {
            if let Some(events) = self.logical_events(path) {
                children.insert(0, events);
            }
        }

        Ok((status, children))
    }

    fn probe(&self, location: &ContainerLocation) -> StdResult<ProbedContainer, EngineError> {
        self.engine.with_container(location, |container| {
            let name = container.name().map(str::to_owned);
            let sounds = describe_all(container)?;

            Ok(ProbedContainer { name, sounds })
        })
    }

    fn logical_events(&self, path: &Path) -> Option<AnalysisNode> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();

        let result = self.engine.with_backend(|backend| -> StdResult<_, EngineError> {
            let bank = match backend.load_bank(path) {
                Err(e) if e.kind() == EngineErrorKind::AlreadyLoaded => {
                    debug!(%file_name, "bank already loaded, looking it up");
                    backend.find_loaded_bank(&file_name)
                }
                loaded => loaded,
            }?;

            backend.bank_events(bank)
        });

        match result {
            Ok(events) if events.is_empty() => None,
            Ok(events) => Some(AnalysisNode::EventGroup(EventGroup {
                name: EVENT_GROUP_NAME.to_owned(),
                selected: true,
                children: events
                    .into_iter()
                    .map(|info| AnalysisNode::Event(EventNode { info, selected: true }))
                    .collect(),
            })),
            Err(e) if e.kind() == EngineErrorKind::Unsupported => {
                debug!(%file_name, "engine has no logical bank data");
                None
            }
            Err(e) => {
                warn!(%file_name, reason = %error_chain(&e), "failed to read bank events");
                None
            }
        }
    }
}

// A probe always describes the whole container; stops are honored between containers.
fn describe_all(
    container: &mut dyn OpenContainer,
) -> StdResult<Vec<SubSoundDescriptor>, EngineError> {
    (0..container.sub_sound_count())
        .map(|index| container.describe(index))
        .collect()
}

// Standalone results (an .fsb file, or a bank flattened into its only container)
// drop sub-sounds that have neither a length nor a name.
fn leaves(
    container_stem: &str,
    sounds: Vec<SubSoundDescriptor>,
    standalone: bool,
) -> Vec<AnalysisNode> {
    let mut resolver = NameResolver::new();

    sounds
        .into_iter()
        .filter(|sound| {
            let empty = standalone && sound.length_ms == 0 && sound.name.is_none();
            if empty {
                debug!(index = sound.index, "discarding empty sub-sound");
            }
            !empty
        })
        .map(|descriptor| {
            let base = descriptor
                .name
                .as_deref()
                .map(sanitize_file_name)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("{container_stem}_{}", descriptor.index));

            AnalysisNode::SubSoundLeaf(SubSoundLeaf {
                name: resolver.claim(&base, ""),
                descriptor,
                selected: true,
            })
        })
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
        .into_owned()
}

fn file_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map_or_else(|| display_name(path), |stem| stem.to_string_lossy().into_owned());

    sanitize_file_name(&stem)
}
