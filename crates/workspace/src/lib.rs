pub mod coords;
pub mod error;
pub mod loader;
pub mod model;
pub mod module;
pub mod repository;
pub mod workspace;

pub use coords::{ArtifactCoords, Coordinate};
pub use error::{LoaderError, Lookup, LookupError, ModelBuildError, ModuleError};
pub use loader::{error_chain, WorkspaceLoader};
pub use model::{EffectiveModelBuilder, InheritanceModelBuilder, RawModel};
pub use module::{LocalModule, ModuleDependency, ModuleDescriptor, ModuleId, ModuleRef, SourceSet};
pub use repository::{ArtifactCache, LocalRepository};
pub use workspace::Workspace;
