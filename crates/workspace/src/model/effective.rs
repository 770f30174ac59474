//! Effective model building
//!
//! The workspace asks an [`EffectiveModelBuilder`] for a flattened view of a module
//! when a resolver needs it. The default [`InheritanceModelBuilder`] merges the
//! local parent chain, applies active profiles and interpolates expressions.

use super::profile::{active_profiles, apply_profile, merge_build_fields, ProfileSelection};
use super::utils::{has_expression, interpolate, is_unresolved_version};
use super::{merge_configuration, Build, Dependency, Plugin, PluginExecution, RawModel};
use crate::error::ModelBuildError;
use mvnspace_core::SystemProperties;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

const DEFAULT_BUILD_DIR: &str = "target";

/// Everything a builder needs to flatten one module
#[derive(Debug, Clone)]
pub struct ModelBuildRequest<'a> {
    pub model: &'a RawModel,
    /// Local parent chain, nearest first
    pub parents: Vec<&'a RawModel>,
    pub system_properties: &'a SystemProperties,
    pub profiles: ProfileSelection<'a>,
    /// Version already resolved by the workspace, used for placeholder versions
    pub resolved_version: Option<&'a str>,
}

pub trait EffectiveModelBuilder: Send + Sync {
    fn build(&self, request: &ModelBuildRequest<'_>) -> Result<RawModel, ModelBuildError>;
}

/// Flattens the local parent chain the way Maven inheritance does
#[derive(Debug, Clone, Copy, Default)]
pub struct InheritanceModelBuilder;

impl EffectiveModelBuilder for InheritanceModelBuilder {
    fn build(&self, request: &ModelBuildRequest<'_>) -> Result<RawModel, ModelBuildError> {
        let mut seen = HashSet::new();
        seen.insert(request.model.descriptor.as_path());
        for parent in &request.parents {
            if !seen.insert(parent.descriptor.as_path()) {
                return Err(ModelBuildError::CyclicParent(
                    request.model.descriptor.display().to_string(),
                ));
            }
        }

        let mut effective: Option<RawModel> = None;
        for layer in request.parents.iter().rev().chain(std::iter::once(&request.model)) {
            let mut layer = (*layer).clone();
            let profiles: Vec<_> = active_profiles(&layer, request.system_properties, request.profiles)
                .into_iter()
                .cloned()
                .collect();
            for profile in &profiles {
                debug!(profile = %profile.id, model = %layer.artifact_id, "Applying profile");
                apply_profile(&mut layer, profile);
            }
            effective = Some(match effective {
                None => layer,
                Some(parent) => inherit(parent, layer),
            });
        }

        // the chain always contains the requested model
        let mut effective = effective.unwrap_or_else(|| request.model.clone());
        interpolate_model(&mut effective, request)?;
        Ok(effective)
    }
}

fn inherit(parent: RawModel, child: RawModel) -> RawModel {
    let mut properties = parent.properties;
    properties.extend(child.properties);

    let build = match (parent.build, child.build) {
        (Some(parent), Some(child)) => Some(inherit_build(parent, child)),
        (Some(parent), None) => Some(inherit_build(parent, Build::default())),
        (None, child) => child,
    };

    RawModel {
        group_id: child.group_id.or(parent.group_id),
        version: child.version.or(parent.version),
        properties,
        dependencies: merge_dependencies(parent.dependencies, child.dependencies),
        dependency_management: merge_dependencies(
            parent.dependency_management,
            child.dependency_management,
        ),
        build,
        ..child
    }
}

fn merge_dependencies(parent: Vec<Dependency>, child: Vec<Dependency>) -> Vec<Dependency> {
    let mut merged: Vec<Dependency> = parent
        .into_iter()
        .filter(|p| !child.iter().any(|c| c.management_key() == p.management_key()))
        .collect();
    merged.extend(child);
    merged
}

fn inherit_build(parent: Build, child: Build) -> Build {
    let mut build = Build {
        plugins: merge_plugins(&parent.plugins, &child.plugins),
        plugin_management: merge_plugins(&parent.plugin_management, &child.plugin_management),
        ..parent
    };
    // resources are inherited as a whole unless the child declares its own
    merge_build_fields(&mut build, &child);
    build
}

fn merge_plugins(parent: &[Plugin], child: &[Plugin]) -> Vec<Plugin> {
    let mut merged: Vec<Plugin> = parent.to_vec();
    for plugin in child {
        match merged.iter_mut().find(|p| p.key() == plugin.key()) {
            Some(existing) => *existing = merge_plugin(plugin, existing),
            None => merged.push(plugin.clone()),
        }
    }
    merged
}

fn merge_plugin(child: &Plugin, parent: &Plugin) -> Plugin {
    let mut executions: Vec<PluginExecution> = parent.executions.clone();
    for execution in &child.executions {
        match executions.iter_mut().find(|e| e.id == execution.id) {
            Some(existing) => {
                let mut goals = existing.goals.clone();
                goals.extend(execution.goals.iter().filter(|g| !existing.goals.contains(g)).cloned());
                *existing = PluginExecution {
                    id: execution.id.clone(),
                    phase: execution.phase.clone().or_else(|| existing.phase.clone()),
                    goals,
                    configuration: merge_configuration(
                        execution.configuration.as_ref(),
                        existing.configuration.as_ref(),
                    ),
                };
            }
            None => executions.push(execution.clone()),
        }
    }

    Plugin {
        group_id: child.group_id.clone(),
        artifact_id: child.artifact_id.clone(),
        version: child.version.clone().or_else(|| parent.version.clone()),
        configuration: merge_configuration(child.configuration.as_ref(), parent.configuration.as_ref()),
        executions,
    }
}

fn interpolate_model(model: &mut RawModel, request: &ModelBuildRequest<'_>) -> Result<(), ModelBuildError> {
    let basedir = model.dir().to_path_buf();
    let mut project: BTreeMap<String, String> = BTreeMap::new();
    project.insert("project.basedir".to_string(), basedir.display().to_string());
    project.insert("basedir".to_string(), basedir.display().to_string());
    project.insert("project.artifactId".to_string(), model.artifact_id.clone());
    if let Some(group_id) = model.group_id.as_ref().or(model.parent.as_ref().map(|p| &p.group_id)) {
        project.insert("project.groupId".to_string(), group_id.clone());
    }
    if let Some(parent) = &model.parent {
        project.insert("project.parent.groupId".to_string(), parent.group_id.clone());
        project.insert("project.parent.version".to_string(), parent.version.clone());
    }

    let system = request.system_properties;
    let properties = model.properties.clone();
    let base_lookup = |name: &str| -> Option<String> {
        system
            .get(name)
            .or_else(|| project.get(name).cloned())
            .or_else(|| properties.get(name).cloned())
    };

    let declared = model
        .version
        .clone()
        .or_else(|| model.parent.as_ref().map(|p| p.version.clone()));
    let version = match (declared, request.resolved_version) {
        (Some(v), Some(resolved)) if is_unresolved_version(&v) => resolved.to_string(),
        (Some(v), _) => interpolate(&v, &base_lookup),
        (None, Some(resolved)) => resolved.to_string(),
        (None, None) => String::new(),
    };
    if has_expression(&version) {
        return Err(ModelBuildError::Uninterpolated {
            model: model.artifact_id.clone(),
            field: "version",
            expression: version,
        });
    }

    let build_dir = model
        .build
        .as_ref()
        .and_then(|b| b.directory.as_deref())
        .map(|d| interpolate(d, &base_lookup))
        .unwrap_or_else(|| DEFAULT_BUILD_DIR.to_string());
    let build_dir = absolutize(&basedir, &build_dir);

    let lookup = |name: &str| -> Option<String> {
        match name {
            "project.version" | "version" => Some(version.clone()),
            "project.build.directory" => Some(build_dir.clone()),
            _ => base_lookup(name),
        }
    };

    model.version = Some(version.clone());
    if let Some(group_id) = &model.group_id {
        model.group_id = Some(interpolate(group_id, &lookup));
    }
    for value in model.properties.values_mut() {
        *value = interpolate(value, &lookup);
    }
    for dep in model
        .dependencies
        .iter_mut()
        .chain(model.dependency_management.iter_mut())
    {
        interpolate_dependency(dep, &lookup);
    }
    if let Some(build) = model.build.as_mut() {
        for field in [
            &mut build.directory,
            &mut build.output_directory,
            &mut build.test_output_directory,
            &mut build.source_directory,
            &mut build.test_source_directory,
            &mut build.final_name,
        ] {
            if let Some(value) = field.as_mut() {
                *value = interpolate(value, &lookup);
            }
        }
    }
    Ok(())
}

fn interpolate_dependency(dep: &mut Dependency, lookup: &dyn Fn(&str) -> Option<String>) {
    dep.group_id = interpolate(&dep.group_id, lookup);
    dep.artifact_id = interpolate(&dep.artifact_id, lookup);
    dep.kind = interpolate(&dep.kind, lookup);
    dep.classifier = interpolate(&dep.classifier, lookup);
    if let Some(version) = dep.version.as_mut() {
        *version = interpolate(version, lookup);
    }
    if let Some(scope) = dep.scope.as_mut() {
        *scope = interpolate(scope, lookup);
    }
}

fn absolutize(base: &Path, value: &str) -> String {
    let path = Path::new(value);
    if path.is_absolute() {
        value.to_string()
    } else {
        base.join(path).display().to_string()
    }
}
