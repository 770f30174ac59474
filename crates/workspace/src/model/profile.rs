//! Profile activation

use super::{Build, Profile, RawModel};
use mvnspace_core::SystemProperties;

/// Profiles selected on the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileSelection<'a> {
    pub active: &'a [String],
    pub inactive: &'a [String],
}

impl<'a> ProfileSelection<'a> {
    pub fn new(active: &'a [String], inactive: &'a [String]) -> Self {
        Self { active, inactive }
    }
}

/// Profiles of `model` that apply under the given properties and selection.
///
/// Explicit deactivation always wins. `activeByDefault` profiles only apply when
/// no other profile of the same model is activated.
pub fn active_profiles<'m>(
    model: &'m RawModel,
    properties: &SystemProperties,
    selection: ProfileSelection<'_>,
) -> Vec<&'m Profile> {
    let mut active = Vec::new();
    let mut defaults = Vec::new();

    for profile in &model.profiles {
        if selection.inactive.contains(&profile.id) {
            continue;
        }
        if selection.active.contains(&profile.id) || property_matches(profile, properties) {
            active.push(profile);
        } else if profile
            .activation
            .as_ref()
            .is_some_and(|a| a.active_by_default)
        {
            defaults.push(profile);
        }
    }

    if active.is_empty() {
        defaults
    } else {
        active
    }
}

fn property_matches(profile: &Profile, properties: &SystemProperties) -> bool {
    let Some(property) = profile.activation.as_ref().and_then(|a| a.property.as_ref()) else {
        return false;
    };

    if let Some(name) = property.name.strip_prefix('!') {
        return !properties.contains(name);
    }

    let actual = properties.get(&property.name);
    match property.value.as_deref() {
        None => actual.is_some(),
        Some(expected) => match expected.strip_prefix('!') {
            Some(negated) => actual.as_deref() != Some(negated),
            None => actual.as_deref() == Some(expected),
        },
    }
}

/// Module paths declared by the model and its active profiles
pub fn modules_with_profiles(
    model: &RawModel,
    properties: &SystemProperties,
    selection: ProfileSelection<'_>,
) -> Vec<String> {
    let mut modules = model.modules.clone();
    for profile in active_profiles(model, properties, selection) {
        for module in &profile.modules {
            if !modules.contains(module) {
                modules.push(module.clone());
            }
        }
    }
    modules
}

/// Folds a profile into the model it belongs to
pub fn apply_profile(model: &mut RawModel, profile: &Profile) {
    for module in &profile.modules {
        if !model.modules.contains(module) {
            model.modules.push(module.clone());
        }
    }
    model
        .properties
        .extend(profile.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    model.dependencies.extend(profile.dependencies.iter().cloned());
    model
        .dependency_management
        .extend(profile.dependency_management.iter().cloned());

    if let Some(profile_build) = &profile.build {
        let build = model.build.get_or_insert_with(Build::default);
        merge_build_fields(build, profile_build);
        build.plugins.extend(profile_build.plugins.iter().cloned());
        build
            .plugin_management
            .extend(profile_build.plugin_management.iter().cloned());
    }
}

/// Copies the directory settings `overlay` declares onto `build`
pub(crate) fn merge_build_fields(build: &mut Build, overlay: &Build) {
    fn take(target: &mut Option<String>, value: &Option<String>) {
        if value.is_some() {
            *target = value.clone();
        }
    }
    take(&mut build.directory, &overlay.directory);
    take(&mut build.output_directory, &overlay.output_directory);
    take(&mut build.test_output_directory, &overlay.test_output_directory);
    take(&mut build.source_directory, &overlay.source_directory);
    take(&mut build.test_source_directory, &overlay.test_source_directory);
    take(&mut build.final_name, &overlay.final_name);
    if !overlay.resources.is_empty() {
        build.resources = overlay.resources.clone();
    }
    if !overlay.test_resources.is_empty() {
        build.test_resources = overlay.test_resources.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::parse_model;
    use std::path::Path;

    const POM: &str = r#"<project>
        <groupId>org.acme</groupId>
        <artifactId>root</artifactId>
        <version>1</version>
        <modules><module>core</module></modules>
        <profiles>
            <profile>
                <id>default-modules</id>
                <activation><activeByDefault>true</activeByDefault></activation>
                <modules><module>docs</module></modules>
            </profile>
            <profile>
                <id>native</id>
                <activation><property><name>native</name></property></activation>
                <modules><module>native</module></modules>
            </profile>
            <profile>
                <id>not-quick</id>
                <activation><property><name>!quickly</name></property></activation>
                <modules><module>it</module></modules>
            </profile>
            <profile>
                <id>jdk</id>
                <activation><property><name>jdk</name><value>!8</value></property></activation>
                <modules><module>modern</module></modules>
            </profile>
            <profile>
                <id>manual</id>
                <modules><module>manual</module></modules>
            </profile>
        </profiles>
    </project>"#;

    fn ids(model: &RawModel, props: &SystemProperties, active: &[String], inactive: &[String]) -> Vec<String> {
        active_profiles(model, props, ProfileSelection::new(active, inactive))
            .into_iter()
            .map(|p| p.id.clone())
            .collect()
    }

    #[test]
    fn test_property_activation() {
        let model = parse_model(POM, Path::new("/ws/pom.xml")).unwrap();

        let props = SystemProperties::new().with("quickly", "true");
        assert_eq!(ids(&model, &props, &[], &[]), vec!["jdk"]);

        let props = SystemProperties::new().with("native", "true").with("quickly", "true").with("jdk", "8");
        assert_eq!(ids(&model, &props, &[], &[]), vec!["native"]);

        let props = SystemProperties::new().with("jdk", "8");
        assert_eq!(ids(&model, &props, &[], &[]), vec!["not-quick"]);
    }

    #[test]
    fn test_active_by_default_yields_to_other_profiles() {
        let model = parse_model(POM, Path::new("/ws/pom.xml")).unwrap();
        let props = SystemProperties::new().with("quickly", "true").with("jdk", "8");
        assert_eq!(ids(&model, &props, &[], &[]), vec!["default-modules"]);

        let manual = vec!["manual".to_string()];
        assert_eq!(ids(&model, &props, &manual, &[]), vec!["manual"]);
    }

    #[test]
    fn test_explicit_deactivation_wins() {
        let model = parse_model(POM, Path::new("/ws/pom.xml")).unwrap();
        let props = SystemProperties::new().with("native", "true").with("jdk", "8");
        let inactive = vec!["native".to_string(), "not-quick".to_string()];
        assert_eq!(ids(&model, &props, &[], &inactive), vec!["default-modules"]);
    }

    #[test]
    fn test_modules_with_profiles() {
        let model = parse_model(POM, Path::new("/ws/pom.xml")).unwrap();
        let props = SystemProperties::new().with("native", "true").with("jdk", "8");
        let modules = modules_with_profiles(&model, &props, ProfileSelection::default());
        assert_eq!(modules, vec!["core", "native", "it"]);
    }

    #[test]
    fn test_apply_profile_merges_build() {
        let mut model = parse_model(POM, Path::new("/ws/pom.xml")).unwrap();
        let profile = Profile {
            id: "custom".to_string(),
            properties: [("flag".to_string(), "on".to_string())].into_iter().collect(),
            build: Some(Build {
                directory: Some("out".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        apply_profile(&mut model, &profile);
        assert_eq!(model.properties.get("flag").unwrap(), "on");
        assert_eq!(model.build.unwrap().directory.as_deref(), Some("out"));
    }
}
