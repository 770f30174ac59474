//! Local artifact cache lookup

use crate::coords::ArtifactCoords;
use mvnspace_core::FileSystem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Read-only view of an on-disk artifact cache
pub trait ArtifactCache: Send + Sync {
    /// Where the artifact would be stored
    fn path_for(&self, coords: &ArtifactCoords) -> PathBuf;

    fn contains(&self, coords: &ArtifactCoords) -> bool;
}

/// Maven local repository layout: `<group path>/<artifactId>/<version>/<file>`
pub struct LocalRepository {
    base: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl LocalRepository {
    pub fn new(base: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            base: base.into(),
            fs,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }
}

impl ArtifactCache for LocalRepository {
    fn path_for(&self, coords: &ArtifactCoords) -> PathBuf {
        let mut path = self.base.clone();
        path.extend(coords.group_id.split('.'));
        path.push(&coords.artifact_id);
        path.push(&coords.version);
        path.push(coords.file_name(&coords.version));
        path
    }

    fn contains(&self, coords: &ArtifactCoords) -> bool {
        self.fs.is_file(&self.path_for(coords))
    }
}
