//! Artifact location and model lookups on discovered workspaces

mod support;

use mvnspace_workspace::{ArtifactCoords, Coordinate, Lookup, ModuleDependency, Workspace};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use support::{aggregator, child, ProjectTree, GROUP};

/// root (pom, `${revision}` = 1.0) with `app` (has sources) and `lib` (no sources)
fn tree() -> ProjectTree {
    let tree = ProjectTree::new();
    tree.pom(
        ".",
        &aggregator("root", "${revision}", &["app", "lib"], "<properties><revision>1.0</revision></properties>"),
    )
    .pom("app", &child("root", "${revision}", "app", ""))
    .file("app/src/main/java/App.java", "class App {}\n")
    .pom("lib", &child("root", "${revision}", "lib", ""));
    tree
}

fn found(lookup: Lookup<PathBuf>) -> PathBuf {
    match lookup {
        Lookup::Found(path) => path,
        Lookup::NotFound => panic!("expected a path, got NotFound"),
        Lookup::Error(e) => panic!("expected a path, got {e}"),
    }
}

fn jar(artifact: &str, version: &str) -> ArtifactCoords {
    ArtifactCoords::jar(GROUP, artifact, version)
}

#[test]
fn test_inherited_build_directories() {
    let tree = ProjectTree::new();
    tree.pom(
        ".",
        &aggregator(
            "root",
            "1.0",
            &["app"],
            r#"<properties><classes.name>custom-classes</classes.name></properties>
  <build>
    <directory>${project.basedir}/custom-target</directory>
    <outputDirectory>${project.build.directory}/${classes.name}</outputDirectory>
    <testOutputDirectory>other-test-classes</testOutputDirectory>
    <resources><resource><directory>src/main/web</directory><targetPath>META-INF/resources</targetPath></resource></resources>
  </build>"#,
        ),
    )
    .pom("app", &child("root", "1.0", "app", ""));

    let ws = tree.load("app").unwrap();
    let app = ws.current_module().unwrap();

    assert_eq!(app.output_dir(), tree.path("app/custom-target"));
    assert_eq!(app.classes_dir(), tree.path("app/custom-target/custom-classes"));
    assert_eq!(app.test_classes_dir(), tree.path("app/other-test-classes"));
    assert_eq!(app.sources_dir(), tree.path("app/src/main/java"));
    assert_eq!(app.generated_sources_dir(), tree.path("app/custom-target/generated-sources/annotations"));

    let resources = app.resources_dirs();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].dir, tree.path("app/src/main/web"));
    assert_eq!(
        resources[0].target,
        tree.path("app/custom-target/custom-classes/META-INF/resources")
    );

    let root = ws.project(GROUP, "root").unwrap();
    assert_eq!(root.output_dir(), tree.path("custom-target"));
}

#[test]
fn test_default_build_directories() {
    let tree = tree();
    let ws = tree.load("app").unwrap();
    let app = ws.current_module().unwrap();

    assert_eq!(app.output_dir(), tree.path("app/target"));
    assert_eq!(app.classes_dir(), tree.path("app/target/classes"));
    assert_eq!(app.test_classes_dir(), tree.path("app/target/test-classes"));
    assert_eq!(app.test_sources_dir(), tree.path("app/src/test/java"));
    assert_eq!(app.resources_dirs()[0].dir, tree.path("app/src/main/resources"));
    assert_eq!(app.test_resources_dirs()[0].target, tree.path("app/target/test-classes"));
}

#[test]
fn test_find_compiled_classes_and_packaged_jar() {
    let tree = tree();
    tree.dir("app/target/classes");
    let ws = tree.load(".").unwrap();

    assert_eq!(found(ws.find_artifact(&jar("app", "1.0"))), tree.path("app/target/classes"));

    tree.file("app/target/app-1.0.jar", "");
    assert_eq!(found(ws.find_artifact(&jar("app", "1.0"))), tree.path("app/target/app-1.0.jar"));
}

#[test]
fn test_find_with_placeholder_request_version() {
    let tree = tree();
    tree.dir("app/target/classes");
    let ws = tree.load(".").unwrap();

    assert!(ws.find_artifact(&jar("app", "${revision}")).is_found());
    assert!(ws.find_artifact(&jar("app", "")).is_found());
    assert!(ws.find_artifact(&jar("app", "2.0")).is_not_found());
    assert!(ws.find_artifact(&jar("unknown", "1.0")).is_not_found());
}

#[test]
fn test_test_classes_for_tests_classifier() {
    let tree = tree();
    tree.dir("app/target/test-classes");
    let ws = tree.load(".").unwrap();

    let tests = ArtifactCoords::new(GROUP, "app", "tests", "jar", "1.0");
    assert_eq!(found(ws.find_artifact(&tests)), tree.path("app/target/test-classes"));

    let test_jar = ArtifactCoords::new(GROUP, "app", "", "test-jar", "1.0");
    assert_eq!(found(ws.find_artifact(&test_jar)), tree.path("app/target/test-classes"));
}

#[test]
fn test_other_classifier_without_output_is_not_found() {
    let tree = tree();
    let ws = tree.load(".").unwrap();

    let sources = ArtifactCoords::new(GROUP, "app", "sources", "jar", "1.0");
    assert!(ws.find_artifact(&sources).is_not_found());

    tree.file("app/target/app-1.0-sources.jar", "");
    assert_eq!(found(ws.find_artifact(&sources)), tree.path("app/target/app-1.0-sources.jar"));
}

#[test]
fn test_sourceless_module_gets_empty_classes_dir_once() {
    let tree = tree();
    let ws = tree.load(".").unwrap();
    let classes = tree.path("lib/target/classes");
    assert!(!classes.exists());

    let first = found(ws.find_artifact(&jar("lib", "1.0")));
    assert_eq!(first, classes);
    assert!(classes.is_dir());

    let second = found(ws.find_artifact(&jar("lib", "1.0")));
    assert_eq!(first, second);
    assert_eq!(fs::read_dir(&classes).unwrap().count(), 0);
}

#[test]
fn test_sourceless_module_with_cached_jar_is_not_served() {
    let tree = tree();
    tree.file(".m2/repository/org/acme/lib/1.0/lib-1.0.jar", "");
    let ws = tree.load(".").unwrap();

    assert!(ws.find_artifact(&jar("lib", "1.0")).is_not_found());
    assert!(!tree.path("lib/target/classes").exists());
}

#[test]
fn test_module_with_sources_but_no_build_is_not_found() {
    let tree = tree();
    let ws = tree.load(".").unwrap();
    assert!(ws.find_artifact(&jar("app", "1.0")).is_not_found());
    assert!(!tree.path("app/target/classes").exists());
}

#[test]
fn test_pom_lookups() {
    let tree = tree();
    let ws = tree.load(".").unwrap();
    let pom = |artifact: &str| ArtifactCoords::pom(GROUP, artifact, "1.0");

    assert_eq!(found(ws.find_artifact(&pom("root"))), tree.path("pom.xml"));
    // unbuilt module with sources
    assert!(ws.find_artifact(&pom("app")).is_not_found());

    tree.dir("app/target");
    assert_eq!(found(ws.find_artifact(&pom("app"))), tree.path("app/pom.xml"));
}

#[test]
fn test_prefer_workspace_poms() {
    let tree = tree();
    let ws = tree
        .load_with(".", tree.config().with_prefer_poms_from_workspace(true))
        .unwrap();
    let pom = ArtifactCoords::pom(GROUP, "app", "1.0");
    assert_eq!(found(ws.find_artifact(&pom)), tree.path("app/pom.xml"));
}

#[test]
fn test_find_versions() {
    let tree = tree();
    tree.dir("app/target/classes");
    let ws = tree.load(".").unwrap();

    assert_eq!(ws.find_versions(&jar("app", "1.0")), vec!["1.0".to_string()]);
    assert_eq!(ws.find_versions(&jar("app", "")), vec!["1.0".to_string()]);
    assert!(ws.find_versions(&jar("app", "0.9")).is_empty());
    assert!(ws.find_versions(&jar("unknown", "1.0")).is_empty());
}

#[test]
fn test_model_lookups() {
    let tree = tree();
    let ws = tree.load(".").unwrap();

    let raw = ws.resolve_raw_model(GROUP, "app", "${revision}");
    assert!(raw.is_found());
    assert!(ws.resolve_raw_model(GROUP, "app", "1.0").is_not_found());

    match ws.resolve_effective_model(GROUP, "app", "1.0") {
        Lookup::Found(model) => {
            assert_eq!(model.version.as_deref(), Some("1.0"));
            assert_eq!(model.properties.get("revision").map(String::as_str), Some("1.0"));
        }
        other => panic!("expected effective model, got {other:?}"),
    }
    assert!(ws.resolve_effective_model(GROUP, "app", "2.0").is_not_found());
    assert!(ws.resolve_effective_model("org.other", "app", "1.0").is_not_found());
}

#[test]
fn test_module_descriptor_is_cached() {
    let tree = tree();
    tree.pom(
        "app",
        &child(
            "root",
            "${revision}",
            "app",
            r#"<dependencies>
    <dependency><groupId>org.acme</groupId><artifactId>lib</artifactId><version>${project.version}</version></dependency>
  </dependencies>"#,
        ),
    );
    let ws: Workspace = tree.load("app").unwrap();
    let coordinate = Coordinate::new(GROUP, "app");

    let first = ws.to_module_descriptor(&coordinate).found().unwrap();
    let second = ws.to_module_descriptor(&coordinate).found().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(first.version, "1.0");
    assert_eq!(first.build_file, tree.path("app/pom.xml"));
    assert_eq!(first.parent.as_ref().unwrap().coordinate, Coordinate::new(GROUP, "root"));
    assert_eq!(first.main_sources().unwrap().sources[0].dir, tree.path("app/src/main/java"));
    assert_eq!(first.test_sources().unwrap().classifier, "tests");
    match &first.dependencies[0] {
        ModuleDependency::External(dep) => assert_eq!(dep.version.as_deref(), Some("1.0")),
        other => panic!("unexpected dependency {other:?}"),
    }

    assert!(ws
        .to_module_descriptor(&Coordinate::new(GROUP, "missing"))
        .is_not_found());
}
