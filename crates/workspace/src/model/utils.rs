//! Helpers shared by discovery and module construction: version placeholders,
//! property interpolation and descriptor location.

use super::{RawModel, POM_XML};
use crate::error::ModuleError;
use mvnspace_core::{FileSystem, SystemProperties};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

pub const REVISION: &str = "revision";
pub const SHA1: &str = "sha1";
pub const CHANGELIST: &str = "changelist";

const MAX_INTERPOLATION_DEPTH: usize = 16;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{(revision|sha1|changelist)\}").expect("placeholder pattern is valid")
    })
}

fn expression_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("expression pattern is valid"))
}

/// True if the version contains a CI-friendly placeholder
pub fn is_unresolved_version(version: &str) -> bool {
    placeholder_pattern().is_match(version)
}

/// Substitutes the version placeholders.
///
/// Process-wide properties take precedence over the model property maps, which
/// are consulted in the given order. Returns `None` if any placeholder has no value.
pub fn resolve_version<'a>(
    raw: &str,
    model_properties: impl IntoIterator<Item = &'a BTreeMap<String, String>>,
    system: &SystemProperties,
) -> Option<String> {
    if !is_unresolved_version(raw) {
        return Some(raw.to_string());
    }
    let maps: Vec<&BTreeMap<String, String>> = model_properties.into_iter().collect();
    let lookup = |name: &str| -> Option<String> {
        system
            .get(name)
            .or_else(|| maps.iter().find_map(|m| m.get(name).cloned()))
    };

    let mut unresolved = false;
    let resolved = placeholder_pattern().replace_all(raw, |caps: &Captures| {
        lookup(&caps[1]).unwrap_or_else(|| {
            unresolved = true;
            String::new()
        })
    });
    // a placeholder may expand into another placeholder
    if unresolved || is_unresolved_version(&resolved) {
        None
    } else {
        Some(resolved.into_owned())
    }
}

/// Declared version, falling back to the parent's declared version
pub fn raw_version(model: &RawModel) -> Result<&str, ModuleError> {
    model
        .version
        .as_deref()
        .or_else(|| model.parent.as_ref().map(|p| p.version.as_str()))
        .ok_or_else(|| ModuleError::MissingVersion {
            artifact_id: model.artifact_id.clone(),
            descriptor: model.descriptor.clone(),
        })
}

/// Declared groupId, falling back to the parent's groupId
pub fn group_id(model: &RawModel) -> Result<&str, ModuleError> {
    model
        .group_id
        .as_deref()
        .or_else(|| model.parent.as_ref().map(|p| p.group_id.as_str()))
        .ok_or_else(|| ModuleError::MissingGroupId {
            artifact_id: model.artifact_id.clone(),
            descriptor: model.descriptor.clone(),
        })
}

/// Expands `${name}` expressions; unknown expressions are left untouched.
///
/// Values produced by `lookup` are expanded again, so properties may reference
/// other properties. Self-referencing chains stop after a fixed depth.
pub fn interpolate(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> String {
    interpolate_at(value, lookup, 0)
}

fn interpolate_at(value: &str, lookup: &dyn Fn(&str) -> Option<String>, depth: usize) -> String {
    if depth >= MAX_INTERPOLATION_DEPTH || !value.contains("${") {
        return value.to_string();
    }
    expression_pattern()
        .replace_all(value, |caps: &Captures| match lookup(&caps[1]) {
            Some(v) => interpolate_at(&v, lookup, depth + 1),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// True if `value` still holds an expression after interpolation
pub fn has_expression(value: &str) -> bool {
    expression_pattern().is_match(value)
}

/// Lexically normalizes `.` and `..` components without touching the file system
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Descriptor inside `dir`: the alternate name first, then `pom.xml`
pub fn descriptor_in(fs: &dyn FileSystem, dir: &Path, alternate: Option<&str>) -> Option<PathBuf> {
    alternate
        .into_iter()
        .chain(std::iter::once(POM_XML))
        .map(|name| dir.join(name))
        .find(|candidate| fs.is_file(candidate))
}

/// Resolves a path that may name a descriptor file or a directory holding one
pub fn descriptor_path(fs: &dyn FileSystem, path: &Path, alternate: Option<&str>) -> Option<PathBuf> {
    if fs.is_file(path) {
        Some(path.to_path_buf())
    } else if fs.is_dir(path) {
        descriptor_in(fs, path, alternate)
    } else {
        None
    }
}
