//! The reload protocol.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use parking_lot::{Condvar, Mutex};

use super::builder::{BuildError, Builder, CompileProblem, SourceLocation};
use super::outcome::{BuildOutcome, CompileFailure};
use super::scope::{ArtifactResolver, CodeScope, DirectoryResolver, ResourcePolicy};
use crate::config::ReloadConfig;
use crate::mapping::{GeneratedPosition, PositionMapper, SourceMapper};

/// Observable state of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle,
    Building,
    Reloaded { version: u64 },
    Failed,
}

#[derive(Debug)]
struct Slot {
    building: bool,
    /// Bumped every time a build finishes
    generation: u64,
    last: Option<BuildOutcome>,
    waiting: usize,
    state: ReloadState,
}

/// Serializes rebuilds and hands out a fresh [`CodeScope`] per recompilation.
///
/// At most one build runs at a time. A caller arriving while a build is in flight
/// waits for it and receives that build's outcome instead of starting another.
pub struct VersionManager {
    builder: Arc<dyn Builder>,
    parent: Arc<dyn ArtifactResolver>,
    extension: String,
    policy: ResourcePolicy,
    mapper: SourceMapper,
    version: AtomicU64,
    current: ArcSwapOption<CodeScope>,
    slot: Mutex<Slot>,
    finished: Condvar,
}

impl VersionManager {
    /// Parent resolution comes from `config.parent_dirs`, fixed for the manager's lifetime.
    pub fn new(builder: Arc<dyn Builder>, config: &ReloadConfig) -> Self {
        let parent = Arc::new(DirectoryResolver::new(
            config.parent_dirs.clone(),
            config.artifact_extension.clone(),
        ));
        Self::with_parent(builder, parent, config)
    }

    pub fn with_parent(
        builder: Arc<dyn Builder>,
        parent: Arc<dyn ArtifactResolver>,
        config: &ReloadConfig,
    ) -> Self {
        let mapper = SourceMapper::new(builder.project_path());
        let policy = if config.delegate_resources {
            ResourcePolicy::Parent
        } else {
            ResourcePolicy::Local
        };

        Self {
            builder,
            parent,
            extension: config.artifact_extension.clone(),
            policy,
            mapper,
            version: AtomicU64::new(0),
            current: ArcSwapOption::empty(),
            slot: Mutex::new(Slot {
                building: false,
                generation: 0,
                last: None,
                waiting: 0,
                state: ReloadState::Idle,
            }),
            finished: Condvar::new(),
        }
    }

    /// Rebuild if needed and report what happened.
    pub fn reload(&self) -> BuildOutcome {
        let mut slot = self.slot.lock();
        if slot.building {
            let generation = slot.generation;
            slot.waiting += 1;
            while slot.generation == generation {
                self.finished.wait(&mut slot);
            }
            slot.waiting -= 1;
            crate::debug_event!("reload", "joined in-flight build");
            return slot.last.clone().unwrap_or(BuildOutcome::NoChange);
        }
        slot.building = true;
        slot.state = ReloadState::Building;
        drop(slot);

        // A panic anywhere in the build must still release waiting callers.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.run_build())).unwrap_or_else(|_| {
            tracing::error!("[reload] builder panicked");
            BuildOutcome::UnexpectedError {
                message: "builder panicked".to_string(),
                cause: None,
            }
        });

        let mut slot = self.slot.lock();
        slot.building = false;
        slot.generation += 1;
        slot.state = match &outcome {
            // The previous scope, if any, stays active
            BuildOutcome::NoChange => match self.current_scope() {
                Some(scope) => ReloadState::Reloaded {
                    version: scope.version(),
                },
                None => ReloadState::Idle,
            },
            BuildOutcome::Reloaded(scope) => ReloadState::Reloaded {
                version: scope.version(),
            },
            BuildOutcome::CompileFailure(_) | BuildOutcome::UnexpectedError { .. } => {
                ReloadState::Failed
            }
        };
        slot.last = Some(outcome.clone());
        drop(slot);
        self.finished.notify_all();

        outcome
    }

    fn run_build(&self) -> BuildOutcome {
        match self.builder.build() {
            Ok(false) => {
                crate::debug_event!("reload", "no change");
                BuildOutcome::NoChange
            }
            Ok(true) => {
                let output_dirs = self.builder.output_dirs();
                let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
                let scope = Arc::new(CodeScope::new(
                    version,
                    output_dirs,
                    &self.extension,
                    self.parent.clone(),
                    self.policy,
                ));
                self.current.store(Some(scope.clone()));
                crate::log_event!("reload", "new scope", "v{version}");
                BuildOutcome::Reloaded(scope)
            }
            Err(BuildError::Compilation(problem)) => {
                let failure = self.compile_failure(problem);
                crate::log_event!("reload", "compile failure", "{failure}");
                BuildOutcome::CompileFailure(failure)
            }
            Err(BuildError::Unexpected { message, cause }) => {
                tracing::error!("[reload] unexpected build error: {message}");
                BuildOutcome::UnexpectedError { message, cause }
            }
        }
    }

    /// Move a failure out of generated code when the mapper recognizes the file.
    fn compile_failure(&self, problem: CompileProblem) -> CompileFailure {
        let failure = CompileFailure::from_problem(problem, self.mapper.root());
        let (Some(source), Some(line)) = (failure.source.clone(), failure.line) else {
            return failure;
        };

        let generated = GeneratedPosition {
            file: source,
            line,
            offset: failure.offset,
        };
        match self.mapper.map(&generated) {
            Some(position) => {
                crate::debug_event!("reload", "mapped failure", "{position}");
                failure.relocated(
                    position.file,
                    position.line,
                    position.column,
                    position.offset,
                    generated,
                )
            }
            None => failure,
        }
    }

    /// Invalidate so the next reload recompiles.
    pub fn force_reload(&self) {
        crate::debug_event!("reload", "forced");
        self.builder.force_reload();
    }

    /// Locate a compiled symbol, mapped back to its original source when possible.
    pub fn find_source(&self, symbol: &str, line: Option<usize>) -> Option<SourceLocation> {
        let location = self.builder.find_source(symbol, line)?;
        let Some(generated_line) = location.line else {
            return Some(location);
        };

        match self
            .mapper
            .map(&GeneratedPosition::line(&location.file, generated_line))
        {
            Some(position) => Some(SourceLocation {
                file: position.file,
                line: Some(position.line),
            }),
            None => Some(location),
        }
    }

    pub fn state(&self) -> ReloadState {
        self.slot.lock().state
    }

    /// The active scope, if any build has recompiled yet.
    pub fn current_scope(&self) -> Option<Arc<CodeScope>> {
        self.current.load_full()
    }

    /// Last assigned version; 0 before the first recompilation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Callers currently blocked on an in-flight build.
    pub fn waiting(&self) -> usize {
        self.slot.lock().waiting
    }

    pub fn is_building(&self) -> bool {
        self.slot.lock().building
    }
}

impl std::fmt::Debug for VersionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionManager")
            .field("version", &self.version())
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish()
    }
}
