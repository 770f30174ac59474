//! Module and artifact coordinates

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const TYPE_JAR: &str = "jar";
pub const TYPE_POM: &str = "pom";
pub const TYPE_TEST_JAR: &str = "test-jar";
pub const TESTS_CLASSIFIER: &str = "tests";

/// `(groupId, artifactId)`: identifies a module independent of its version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
}

impl Coordinate {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid coordinates '{input}', expected {expected}")]
pub struct CoordsParseError {
    input: String,
    expected: &'static str,
}

impl FromStr for Coordinate {
    type Err = CoordsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [g, a] if !g.is_empty() && !a.is_empty() => Ok(Coordinate::new(*g, *a)),
            _ => Err(CoordsParseError {
                input: s.to_string(),
                expected: "groupId:artifactId",
            }),
        }
    }
}

/// A fully qualified artifact request as issued by a dependency resolver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArtifactCoords {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
}

impl ArtifactCoords {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        classifier: impl Into<String>,
        kind: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: classifier.into(),
            kind: kind.into(),
            version: version.into(),
        }
    }

    pub fn jar(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::new(group_id, artifact_id, "", TYPE_JAR, version)
    }

    pub fn pom(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::new(group_id, artifact_id, "", TYPE_POM, version)
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(&self.group_id, &self.artifact_id)
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// File extension of the artifact on disk
    pub fn extension(&self) -> &str {
        match self.kind.as_str() {
            TYPE_TEST_JAR | "maven-plugin" | "ejb" | "ejb-client" | "java-source"
            | "javadoc" | "bundle" => TYPE_JAR,
            "" => TYPE_JAR,
            other => other,
        }
    }

    /// Classifier including the one implied by the type (`test-jar` -> `tests`)
    pub fn effective_classifier(&self) -> &str {
        if self.classifier.is_empty() {
            match self.kind.as_str() {
                TYPE_TEST_JAR => TESTS_CLASSIFIER,
                "ejb-client" => "client",
                "java-source" => "sources",
                "javadoc" => "javadoc",
                _ => "",
            }
        } else {
            &self.classifier
        }
    }

    pub fn is_pom(&self) -> bool {
        self.extension() == TYPE_POM
    }

    /// `artifactId-version[-classifier].extension` using the given version
    pub fn file_name(&self, version: &str) -> String {
        let classifier = self.effective_classifier();
        if classifier.is_empty() {
            format!("{}-{}.{}", self.artifact_id, version, self.extension())
        } else {
            format!(
                "{}-{}-{}.{}",
                self.artifact_id,
                version,
                classifier,
                self.extension()
            )
        }
    }
}

impl fmt::Display for ArtifactCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.artifact_id)?;
        if !self.classifier.is_empty() {
            write!(f, ":{}", self.classifier)?;
        }
        write!(f, ":{}:{}", self.kind, self.version)
    }
}

/// Parses `g:a:v`, `g:a:type:v` or `g:a:type:classifier:v`
impl FromStr for ArtifactCoords {
    type Err = CoordsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let coords = match parts.as_slice() {
            [g, a, v] => ArtifactCoords::new(*g, *a, "", TYPE_JAR, *v),
            [g, a, t, v] => ArtifactCoords::new(*g, *a, "", *t, *v),
            [g, a, t, c, v] => ArtifactCoords::new(*g, *a, *c, *t, *v),
            _ => {
                return Err(CoordsParseError {
                    input: s.to_string(),
                    expected: "groupId:artifactId[:type[:classifier]]:version",
                })
            }
        };
        if coords.group_id.is_empty() || coords.artifact_id.is_empty() {
            return Err(CoordsParseError {
                input: s.to_string(),
                expected: "non-empty groupId and artifactId",
            });
        }
        Ok(coords)
    }
}
