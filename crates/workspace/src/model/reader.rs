//! `pom.xml` parsing

use super::{
    Activation, Build, Dependency, Parent, Plugin, PluginExecution, Profile, PropertyActivation,
    RawModel, Resource, XmlNode,
};
use crate::coords::{Coordinate, TYPE_JAR};
use crate::error::ModuleError;
use anyhow::{bail, Result};
use mvnspace_core::FileSystem;
use roxmltree::{Document, Node};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

const DEFAULT_PLUGIN_GROUP: &str = "org.apache.maven.plugins";

/// Reads and parses the descriptor at `path`
pub fn read_model(fs: &dyn FileSystem, path: &Path) -> Result<RawModel, ModuleError> {
    trace!(path = %path.display(), "Reading descriptor");
    let content = fs
        .read_to_string(path)
        .map_err(|e| ModuleError::malformed(path, e))?;
    parse_model(&content, path).map_err(|e| ModuleError::malformed(path, e))
}

/// Parses descriptor content; `path` is recorded as the model's descriptor
pub fn parse_model(content: &str, path: &Path) -> Result<RawModel> {
    let doc = Document::parse(content)?;
    let root = doc.root_element();
    if !root.has_tag_name("project") {
        bail!(
            "Expected <project> as the root element, found <{}>",
            root.tag_name().name()
        );
    }

    let artifact_id = match text(root, "artifactId") {
        Some(id) => id,
        None => bail!("No artifactId found in {}", path.display()),
    };

    let build = child(root, "build").map(parse_build);

    Ok(RawModel {
        descriptor: path.to_path_buf(),
        group_id: text(root, "groupId"),
        artifact_id,
        version: text(root, "version"),
        packaging: text(root, "packaging").unwrap_or_else(|| TYPE_JAR.to_string()),
        parent: child(root, "parent").and_then(parse_parent),
        modules: list(root, "modules", "module"),
        properties: parse_properties(root),
        dependencies: parse_dependencies(root),
        dependency_management: dependency_management(root),
        build,
        profiles: child(root, "profiles")
            .map(|profiles| {
                elements(profiles)
                    .filter(|n| n.has_tag_name("profile"))
                    .map(parse_profile)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|c| c.is_element())
}

/// Trimmed, non-empty text of a direct child element
fn text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|c| c.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn list(node: Node, container: &str, item: &str) -> Vec<String> {
    child(node, container)
        .map(|c| {
            c.children()
                .filter(|n| n.has_tag_name(item))
                .filter_map(|n| n.text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn flag(node: Node, name: &str) -> bool {
    text(node, name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

fn parse_parent(node: Node) -> Option<Parent> {
    // An empty <relativePath/> is meaningful, so it is read without the emptiness filter
    let relative_path = child(node, "relativePath")
        .map(|n| n.text().map(str::trim).unwrap_or_default().to_string());
    Some(Parent {
        group_id: text(node, "groupId")?,
        artifact_id: text(node, "artifactId")?,
        version: text(node, "version")?,
        relative_path,
    })
}

fn parse_properties(node: Node) -> BTreeMap<String, String> {
    child(node, "properties")
        .map(|props| {
            elements(props)
                .map(|p| {
                    let value = p.text().map(str::trim).unwrap_or_default();
                    (p.tag_name().name().to_string(), value.to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_dependencies(node: Node) -> Vec<Dependency> {
    child(node, "dependencies")
        .map(|deps| {
            elements(deps)
                .filter(|n| n.has_tag_name("dependency"))
                .filter_map(parse_dependency)
                .collect()
        })
        .unwrap_or_default()
}

fn dependency_management(node: Node) -> Vec<Dependency> {
    child(node, "dependencyManagement")
        .map(parse_dependencies)
        .unwrap_or_default()
}

fn parse_dependency(node: Node) -> Option<Dependency> {
    let exclusions = child(node, "exclusions")
        .map(|ex| {
            elements(ex)
                .filter_map(|e| {
                    Some(Coordinate::new(
                        text(e, "groupId")?,
                        text(e, "artifactId")?,
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Dependency {
        group_id: text(node, "groupId")?,
        artifact_id: text(node, "artifactId")?,
        version: text(node, "version"),
        kind: text(node, "type").unwrap_or_else(|| TYPE_JAR.to_string()),
        classifier: text(node, "classifier").unwrap_or_default(),
        scope: text(node, "scope"),
        optional: flag(node, "optional"),
        exclusions,
    })
}

fn parse_build(node: Node) -> Build {
    Build {
        directory: text(node, "directory"),
        output_directory: text(node, "outputDirectory"),
        test_output_directory: text(node, "testOutputDirectory"),
        source_directory: text(node, "sourceDirectory"),
        test_source_directory: text(node, "testSourceDirectory"),
        final_name: text(node, "finalName"),
        resources: parse_resources(node, "resources", "resource"),
        test_resources: parse_resources(node, "testResources", "testResource"),
        plugins: parse_plugins(node),
        plugin_management: child(node, "pluginManagement")
            .map(parse_plugins)
            .unwrap_or_default(),
    }
}

fn parse_resources(node: Node, container: &str, item: &str) -> Vec<Resource> {
    child(node, container)
        .map(|c| {
            elements(c)
                .filter(|n| n.has_tag_name(item))
                .map(|r| Resource {
                    directory: text(r, "directory"),
                    target_path: text(r, "targetPath"),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_plugins(node: Node) -> Vec<Plugin> {
    child(node, "plugins")
        .map(|plugins| {
            elements(plugins)
                .filter(|n| n.has_tag_name("plugin"))
                .filter_map(parse_plugin)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_plugin(node: Node) -> Option<Plugin> {
    let executions = child(node, "executions")
        .map(|execs| {
            elements(execs)
                .filter(|n| n.has_tag_name("execution"))
                .map(|e| PluginExecution {
                    id: text(e, "id").unwrap_or_else(|| "default".to_string()),
                    phase: text(e, "phase"),
                    goals: list(e, "goals", "goal"),
                    configuration: child(e, "configuration").map(to_xml_node),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(Plugin {
        group_id: text(node, "groupId").unwrap_or_else(|| DEFAULT_PLUGIN_GROUP.to_string()),
        artifact_id: text(node, "artifactId")?,
        version: text(node, "version"),
        configuration: child(node, "configuration").map(to_xml_node),
        executions,
    })
}

fn parse_profile(node: Node) -> Profile {
    let activation = child(node, "activation").map(|a| Activation {
        active_by_default: flag(a, "activeByDefault"),
        property: child(a, "property").and_then(|p| {
            Some(PropertyActivation {
                name: text(p, "name")?,
                value: text(p, "value"),
            })
        }),
    });

    Profile {
        id: text(node, "id").unwrap_or_else(|| "default".to_string()),
        activation,
        modules: list(node, "modules", "module"),
        properties: parse_properties(node),
        dependencies: parse_dependencies(node),
        dependency_management: dependency_management(node),
        build: child(node, "build").map(parse_build),
    }
}

fn to_xml_node(node: Node) -> XmlNode {
    let children: Vec<XmlNode> = elements(node).map(to_xml_node).collect();
    let text = if children.is_empty() {
        node.text().map(|t| t.trim().to_string())
    } else {
        None
    };
    XmlNode {
        name: node.tag_name().name().to_string(),
        text,
        children,
    }
}
