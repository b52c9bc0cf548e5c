//! Versioned code-loading scopes.
//!
//! A [`CodeScope`] resolves compiled artifacts from the output directories of one
//! build and falls back to a parent resolver fixed at startup. Scopes are never
//! mutated: each rebuild produces a new one with a higher version, so definitions
//! from an older build cannot leak into a newer one.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Something that can locate artifacts and resources on disk.
pub trait ArtifactResolver: Send + Sync + fmt::Debug {
    /// Compiled artifact for a dotted name (`controllers.Home`).
    fn find_artifact(&self, name: &str) -> Option<PathBuf>;

    /// First resource with the given relative name.
    fn find_resource(&self, name: &str) -> Option<PathBuf>;

    /// Every resource with the given relative name, in lookup order.
    fn resources(&self, name: &str) -> Vec<PathBuf>;
}

/// Resolves from an ordered list of directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryResolver {
    dirs: Vec<PathBuf>,
    extension: String,
}

impl DirectoryResolver {
    pub fn new(dirs: Vec<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dirs,
            extension: extension.into(),
        }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    fn candidates<'a>(&'a self, relative: &'a Path) -> impl Iterator<Item = PathBuf> + 'a {
        self.dirs
            .iter()
            .map(move |dir| dir.join(relative))
            .filter(|path| path.is_file())
    }
}

impl ArtifactResolver for DirectoryResolver {
    fn find_artifact(&self, name: &str) -> Option<PathBuf> {
        let relative = artifact_path(name, &self.extension)?;
        self.candidates(&relative).next()
    }

    fn find_resource(&self, name: &str) -> Option<PathBuf> {
        let relative = resource_path(name)?;
        self.candidates(&relative).next()
    }

    fn resources(&self, name: &str) -> Vec<PathBuf> {
        match resource_path(name) {
            Some(relative) => self.candidates(&relative).collect(),
            None => Vec::new(),
        }
    }
}

/// Relative file path of a dotted artifact name: `a.b.C` -> `a/b/C.<ext>`.
pub fn artifact_path(name: &str, extension: &str) -> Option<PathBuf> {
    if name.is_empty() || name.split('.').any(|part| part.is_empty() || part.contains('/')) {
        return None;
    }
    let mut path: PathBuf = name.split('.').collect();
    path.set_extension(extension);
    Some(path)
}

/// Relative resource names only; anything escaping the directory is rejected.
fn resource_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name.trim_start_matches('/'));
    let plain = path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    (plain && !path.as_os_str().is_empty()).then(|| path.to_path_buf())
}

/// Where resource lookups go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourcePolicy {
    /// Output directories first, then the parent
    #[default]
    Local,
    /// Parent only; artifacts still resolve locally first
    Parent,
}

/// Which resolver satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Parent,
}

/// A located artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub origin: Origin,
}

/// A loaded artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub path: PathBuf,
    pub origin: Origin,
    pub bytes: Vec<u8>,
}

/// One generation of loaded code.
pub struct CodeScope {
    version: u64,
    local: DirectoryResolver,
    parent: Arc<dyn ArtifactResolver>,
    policy: ResourcePolicy,
}

impl CodeScope {
    pub fn new(
        version: u64,
        output_dirs: Vec<PathBuf>,
        extension: &str,
        parent: Arc<dyn ArtifactResolver>,
        policy: ResourcePolicy,
    ) -> Self {
        Self {
            version,
            local: DirectoryResolver::new(output_dirs, extension),
            parent,
            policy,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn output_dirs(&self) -> &[PathBuf] {
        self.local.dirs()
    }

    pub fn policy(&self) -> ResourcePolicy {
        self.policy
    }

    pub fn parent(&self) -> &Arc<dyn ArtifactResolver> {
        &self.parent
    }

    /// Locate an artifact: output directories first, then the parent.
    pub fn find_artifact(&self, name: &str) -> Option<ResolvedArtifact> {
        let (path, origin) = match self.local.find_artifact(name) {
            Some(path) => (path, Origin::Local),
            None => (self.parent.find_artifact(name)?, Origin::Parent),
        };
        Some(ResolvedArtifact {
            name: name.to_string(),
            path,
            origin,
        })
    }

    /// Read an artifact's bytes.
    pub fn load_artifact(&self, name: &str) -> io::Result<Artifact> {
        let resolved = self.find_artifact(name).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{name} not found in scope v{}", self.version),
            )
        })?;
        let bytes = fs::read(&resolved.path)?;
        Ok(Artifact {
            name: resolved.name,
            path: resolved.path,
            origin: resolved.origin,
            bytes,
        })
    }

    pub fn find_resource(&self, name: &str) -> Option<PathBuf> {
        match self.policy {
            ResourcePolicy::Local => self
                .local
                .find_resource(name)
                .or_else(|| self.parent.find_resource(name)),
            ResourcePolicy::Parent => self.parent.find_resource(name),
        }
    }

    pub fn resources(&self, name: &str) -> Vec<PathBuf> {
        match self.policy {
            ResourcePolicy::Local => {
                let mut found = self.local.resources(name);
                found.extend(self.parent.resources(name));
                found
            }
            ResourcePolicy::Parent => self.parent.resources(name),
        }
    }
}

impl fmt::Debug for CodeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeScope")
            .field("version", &self.version)
            .field("output_dirs", &self.local.dirs())
            .field("policy", &self.policy)
            .finish()
    }
}
