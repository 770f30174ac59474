//! CLI integration tests
//!
//! Runs the `mvnspace` binary against small projects written to temporary
//! directories and checks output and exit codes.

use serial_test::serial;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn mvnspace(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mvnspace"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("MVNSPACE_ROOT_PROJECT_DIR")
        .env_remove("MVNSPACE_ALTERNATE_POM")
        .env_remove("MVNSPACE_ACTIVE_PROFILES")
        .env("MVNSPACE_LOG_LEVEL", "error")
        .output()
        .expect("Failed to execute mvnspace")
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// root (pom) with modules `core` and `app`; `app` depends on `core` and has sources
fn create_project(dir: &TempDir) {
    let root = dir.path();
    write(
        root,
        "pom.xml",
        r#"<project>
  <groupId>org.acme</groupId>
  <artifactId>root</artifactId>
  <version>${revision}</version>
  <packaging>pom</packaging>
  <properties><revision>1.0-SNAPSHOT</revision></properties>
  <modules><module>core</module><module>app</module></modules>
</project>"#,
    );
    write(
        root,
        "core/pom.xml",
        r#"<project>
  <parent><groupId>org.acme</groupId><artifactId>root</artifactId><version>${revision}</version></parent>
  <artifactId>core</artifactId>
</project>"#,
    );
    write(
        root,
        "app/pom.xml",
        r#"<project>
  <parent><groupId>org.acme</groupId><artifactId>root</artifactId><version>${revision}</version></parent>
  <artifactId>app</artifactId>
  <dependencies>
    <dependency><groupId>org.acme</groupId><artifactId>core</artifactId><version>${project.version}</version></dependency>
  </dependencies>
</project>"#,
    );
    write(root, "app/src/main/java/App.java", "class App {}\n");
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_cli_help() {
    let output = mvnspace(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("discover"));
    assert!(text.contains("locate"));
    assert!(text.contains("describe"));
}

#[test]
fn test_cli_version() {
    let output = mvnspace(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("mvnspace"));
}

#[test]
#[serial]
fn test_discover_json_from_module() {
    let temp = TempDir::new().unwrap();
    create_project(&temp);
    let app = temp.path().join("app");

    let output = mvnspace(&["discover", app.to_str().unwrap(), "--format", "json"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["current"], "org.acme:app");
    assert_eq!(report["resolved_version"], "1.0-SNAPSHOT");
    let modules = report["modules"].as_array().unwrap();
    assert_eq!(modules.len(), 3);
    assert!(modules.iter().all(|m| m["version"] == "1.0-SNAPSHOT"));
}

#[test]
#[serial]
fn test_discover_with_property_override() {
    let temp = TempDir::new().unwrap();
    create_project(&temp);

    let output = mvnspace(&[
        "discover",
        temp.path().to_str().unwrap(),
        "-Drevision=2.0.0",
        "-f",
        "json",
    ]);
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["resolved_version"], "2.0.0");
}

#[test]
#[serial]
fn test_discover_without_descriptor_fails() {
    let temp = TempDir::new().unwrap();
    let output = mvnspace(&["discover", temp.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
#[serial]
fn test_discover_missing_path_fails() {
    let output = mvnspace(&["discover", "/definitely/not/a/project"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
#[serial]
fn test_locate_built_and_unbuilt_artifacts() {
    let temp = TempDir::new().unwrap();
    create_project(&temp);
    let classes = temp.path().join("app/target/classes");
    fs::create_dir_all(&classes).unwrap();
    let from = temp.path().to_str().unwrap();

    let found = mvnspace(&["locate", "org.acme:app:1.0-SNAPSHOT", "--from", from]);
    assert_eq!(found.status.code(), Some(0));
    assert_eq!(
        Path::new(stdout(&found).trim()),
        classes.canonicalize().unwrap().as_path()
    );

    let wrong_version = mvnspace(&["locate", "org.acme:app:9.9", "--from", from]);
    assert_eq!(wrong_version.status.code(), Some(2));

    let unknown = mvnspace(&["locate", "org.other:lib:1.0", "--from", from]);
    assert_eq!(unknown.status.code(), Some(2));

    let sources = mvnspace(&["locate", "org.acme:app:jar:sources:1.0-SNAPSHOT", "--from", from]);
    assert_eq!(sources.status.code(), Some(2));
}

#[test]
#[serial]
fn test_locate_sourceless_module_creates_classes_dir() {
    let temp = TempDir::new().unwrap();
    create_project(&temp);
    let repo = TempDir::new().unwrap();

    let output = mvnspace(&[
        "locate",
        "org.acme:core:1.0-SNAPSHOT",
        "--from",
        temp.path().to_str().unwrap(),
        "--local-repo",
        repo.path().to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(0));
    assert!(temp.path().join("core/target/classes").is_dir());
}

#[test]
#[serial]
fn test_describe_module_json() {
    let temp = TempDir::new().unwrap();
    create_project(&temp);

    let output = mvnspace(&[
        "describe",
        temp.path().to_str().unwrap(),
        "--module",
        "org.acme:app",
        "-f",
        "json",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["coordinate"], "org.acme:app");
    assert_eq!(report["version"], "1.0-SNAPSHOT");
    assert_eq!(report["parent"], "org.acme:root");
    assert_eq!(report["source_sets"][0]["classifier"], "");
    assert_eq!(report["dependencies"][0]["coordinate"], "org.acme:core");
    assert_eq!(report["dependencies"][0]["version"], "1.0-SNAPSHOT");
}

#[test]
#[serial]
fn test_describe_unknown_module_fails() {
    let temp = TempDir::new().unwrap();
    create_project(&temp);
    let output = mvnspace(&[
        "describe",
        temp.path().to_str().unwrap(),
        "--module",
        "org.acme:missing",
    ]);
    assert_eq!(output.status.code(), Some(1));
}
