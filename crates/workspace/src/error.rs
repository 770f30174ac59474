use crate::coords::Coordinate;
use std::path::PathBuf;
use thiserror::Error;

/// Failures constructing a single module
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Failed to determine the version of {artifact_id} in {}", .descriptor.display())]
    MissingVersion {
        artifact_id: String,
        descriptor: PathBuf,
    },

    #[error("Failed to determine the groupId of {artifact_id} in {}", .descriptor.display())]
    MissingGroupId {
        artifact_id: String,
        descriptor: PathBuf,
    },

    #[error("Failed to resolve version '{version}' of {coordinate} in {}: no workspace to borrow the resolved version from", .descriptor.display())]
    UnresolvedVersion {
        coordinate: Coordinate,
        version: String,
        descriptor: PathBuf,
    },

    #[error("Module descriptor of {0} is already being built")]
    DescriptorCycle(Coordinate),

    #[error("Failed to read descriptor {}", .path.display())]
    MalformedDescriptor {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

impl ModuleError {
    pub fn malformed(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        ModuleError::MalformedDescriptor {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Fatal discovery failures
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Failed to locate a project descriptor for {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to build the effective model of {}", .path.display())]
    ModelBuildFailure {
        path: PathBuf,
        #[source]
        source: ModelBuildError,
    },

    #[error("Failed to load project {}", .path.display())]
    Module {
        path: PathBuf,
        #[source]
        source: ModuleError,
    },

    #[error("Module {coordinate} in {} is already loaded from {}", .path.display(), .existing.display())]
    DuplicateModule {
        path: PathBuf,
        coordinate: Coordinate,
        existing: PathBuf,
    },
}

impl LoaderError {
    pub fn module(path: impl Into<PathBuf>, source: ModuleError) -> Self {
        LoaderError::Module {
            path: path.into(),
            source,
        }
    }

    /// Errors that abort discovery wherever they occur
    pub fn is_always_fatal(&self) -> bool {
        matches!(self, LoaderError::ModelBuildFailure { .. })
    }

    /// The module-level cause, if this error wraps one
    pub fn module_error(&self) -> Option<&ModuleError> {
        match self {
            LoaderError::Module { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Failure reported by an effective model builder
#[derive(Debug, Error)]
pub enum ModelBuildError {
    #[error("Expression '{expression}' in {field} of {model} cannot be interpolated")]
    Uninterpolated {
        model: String,
        field: &'static str,
        expression: String,
    },

    #[error("Parent chain of {0} is cyclic")]
    CyclicParent(String),

    #[error(transparent)]
    Module(#[from] ModuleError),
}

/// Genuine failures surfaced through the resolver-facing protocols
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Failed to build the effective model of {coordinate}")]
    ModelBuild {
        coordinate: Coordinate,
        #[source]
        source: ModelBuildError,
    },

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("Failed to create {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Result of a resolver callback.
///
/// `NotFound` is a defined absence: the caller falls through to remote
/// resolution. Only `Error` signals that something is actually broken.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Error(LookupError),
}

impl<T> Lookup<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Lookup::NotFound)
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::NotFound => Lookup::NotFound,
            Lookup::Error(e) => Lookup::Error(e),
        }
    }

    /// `Ok(None)` for `NotFound`, for callers that want `?`
    pub fn into_result(self) -> Result<Option<T>, LookupError> {
        match self {
            Lookup::Found(value) => Ok(Some(value)),
            Lookup::NotFound => Ok(None),
            Lookup::Error(e) => Err(e),
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }
}
