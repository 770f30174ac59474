use clap::{Args, Parser, Subcommand, ValueEnum};
use mvnspace_core::{SystemProperties, WorkspaceConfig};
use mvnspace_workspace::{ArtifactCoords, Coordinate};
use std::path::PathBuf;

/// Maven multi-module workspace resolver
#[derive(Parser, Debug)]
#[command(
    name = "mvnspace",
    about = "Maven multi-module workspace resolver",
    version,
    author,
    long_about = "mvnspace discovers every module of a multi-module Maven project starting \
                  from any directory inside it, reports the build layout of each module and \
                  locates workspace artifacts the way a dev-mode dependency resolver would."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Discover the workspace around a directory",
        long_about = "Finds the nearest pom.xml, loads its parents, submodules and enclosing \
                      projects, and lists every module of the workspace.\n\n\
                      Examples:\n  \
                      mvnspace discover\n  \
                      mvnspace discover services/api\n  \
                      mvnspace discover --root . -Drevision=1.2.3 -P native\n  \
                      mvnspace discover --format json"
    )]
    Discover(DiscoverArgs),

    #[command(
        about = "Locate a workspace artifact on disk",
        long_about = "Resolves an artifact against the workspace: a packaged file, a compiled \
                      output directory or the module descriptor. Exits with 2 when the \
                      workspace cannot serve the artifact.\n\n\
                      Examples:\n  \
                      mvnspace locate org.acme:app:1.0-SNAPSHOT\n  \
                      mvnspace locate org.acme:app:pom:1.0-SNAPSHOT\n  \
                      mvnspace locate org.acme:app:jar:tests:1.0-SNAPSHOT --from services"
    )]
    Locate(LocateArgs),

    #[command(
        about = "Describe the build layout of a module",
        long_about = "Prints the module descriptor: source sets, output directories, \
                      dependencies and dependency constraints.\n\n\
                      Examples:\n  \
                      mvnspace describe\n  \
                      mvnspace describe services/api --format yaml\n  \
                      mvnspace describe --module org.acme:api"
    )]
    Describe(DescribeArgs),
}

/// Discovery settings shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct WorkspaceArgs {
    #[arg(
        long,
        value_name = "DIR",
        help = "Top-level project directory, loaded before the current module"
    )]
    pub root: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Descriptor file name tried before pom.xml"
    )]
    pub alternate_pom: Option<String>,

    #[arg(long, value_name = "DIR", help = "Local repository directory")]
    pub local_repo: Option<PathBuf>,

    #[arg(
        short = 'D',
        value_name = "NAME=VALUE",
        value_parser = parse_property,
        help = "Define a system property (repeatable)"
    )]
    pub properties: Vec<(String, String)>,

    #[arg(
        short = 'P',
        long = "activate-profiles",
        value_name = "IDS",
        help = "Comma separated profiles to activate, prefix with ! to deactivate"
    )]
    pub profiles: Option<String>,

    #[arg(long, help = "Serve workspace descriptors for modules that were never built")]
    pub prefer_workspace_poms: bool,

    #[arg(long, help = "Build effective models while loading")]
    pub effective: bool,
}

impl WorkspaceArgs {
    /// Environment defaults overridden by the command line
    pub fn to_config(&self) -> WorkspaceConfig {
        let mut config = WorkspaceConfig::default();
        if let Some(root) = &self.root {
            config = config.with_root_project_dir(root);
        }
        if let Some(name) = &self.alternate_pom {
            config = config.with_alternate_pom(name);
        }
        if let Some(repo) = &self.local_repo {
            config = config.with_local_repository(repo);
        }
        if let Some(profiles) = &self.profiles {
            config = config.with_profiles(profiles);
        }
        if self.prefer_workspace_poms {
            config = config.with_prefer_poms_from_workspace(true);
        }
        if self.effective {
            config = config.with_effective_model_builder(true);
        }
        for (name, value) in &self.properties {
            config = config.with_property(name, value);
        }
        config
    }
}

#[derive(Parser, Debug, Clone)]
pub struct DiscoverArgs {
    #[arg(
        value_name = "PATH",
        help = "Directory or descriptor inside the project (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct LocateArgs {
    #[arg(
        value_name = "ARTIFACT",
        help = "Artifact as groupId:artifactId[:type[:classifier]]:version"
    )]
    pub artifact: ArtifactCoords,

    #[arg(
        long,
        value_name = "PATH",
        help = "Directory to discover the workspace from (defaults to current directory)"
    )]
    pub from: Option<PathBuf>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct DescribeArgs {
    #[arg(
        value_name = "PATH",
        help = "Directory or descriptor of the module (defaults to current directory)"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        short = 'm',
        long,
        value_name = "GROUP:ARTIFACT",
        help = "Describe another module of the discovered workspace"
    )]
    pub module: Option<Coordinate>,

    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_property(s: &str) -> Result<(String, String), String> {
    SystemProperties::parse_definition(s).map_err(|e| e.to_string())
}
