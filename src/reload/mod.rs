//! Reload protocol and versioned code-loading scopes.
//!
//! ```text
//! reload() --> Builder::build()
//!                 Ok(false)        -> NoChange            (version untouched)
//!                 Ok(true)         -> Reloaded(scope vN+1)
//!                 Err(Compilation) -> CompileFailure      (mapped to original source)
//!                 Err(Unexpected)  -> UnexpectedError
//! ```

mod builder;
mod manager;
mod outcome;
mod scope;

pub use builder::{BuildError, Builder, CompileProblem, SourceLocation};
pub use manager::{ReloadState, VersionManager};
pub use outcome::{BuildOutcome, CompileFailure, SourceSnapshot, collapse_message};
pub use scope::{
    Artifact, ArtifactResolver, CodeScope, DirectoryResolver, Origin, ResolvedArtifact,
    ResourcePolicy, artifact_path,
};
