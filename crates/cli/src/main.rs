use mvnspace_cli::cli::commands::{CliArgs, Commands, DescribeArgs, DiscoverArgs, LocateArgs, WorkspaceArgs};
use mvnspace_cli::cli::output::{DescriptorReport, LocateReport, OutputFormatter, WorkspaceReport};
use mvnspace_cli::{NAME, VERSION};
use mvnspace_core::logging::{self, parse_level, LoggingConfig};
use mvnspace_core::{FileSystem, RealFileSystem};
use mvnspace_workspace::{error_chain, Lookup, Workspace, WorkspaceLoader};

use clap::Parser;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{debug, error, Level};

/// `locate` found nothing the workspace can serve
const EXIT_NOT_FOUND: i32 = 2;

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Discover(discover_args) => handle_discover(discover_args),
        Commands::Locate(locate_args) => handle_locate(locate_args),
        Commands::Describe(describe_args) => handle_describe(describe_args),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        logging::init_from_env();
        return;
    };
    logging::init_logging(LoggingConfig::with_level(level));
}

fn handle_discover(args: &DiscoverArgs) -> i32 {
    let workspace = match load_workspace(args.path.as_deref(), &args.workspace) {
        Ok(workspace) => workspace,
        Err(code) => return code,
    };

    let formatter = OutputFormatter::new(args.format.into());
    print_output(formatter.format_workspace(&WorkspaceReport::from_workspace(&workspace)))
}

fn handle_locate(args: &LocateArgs) -> i32 {
    let workspace = match load_workspace(args.from.as_deref(), &args.workspace) {
        Ok(workspace) => workspace,
        Err(code) => return code,
    };

    let (path, code) = match workspace.find_artifact(&args.artifact) {
        Lookup::Found(path) => (Some(path), 0),
        Lookup::NotFound => {
            debug!(artifact = %args.artifact, "Artifact is not provided by the workspace");
            (None, EXIT_NOT_FOUND)
        }
        Lookup::Error(e) => {
            error!("Failed to locate {}: {}", args.artifact, error_chain(&e));
            return 1;
        }
    };

    let report = LocateReport {
        artifact: args.artifact.to_string(),
        versions: workspace.find_versions(&args.artifact),
        path,
    };
    let formatter = OutputFormatter::new(args.format.into());
    match print_output(formatter.format_locate(&report)) {
        0 => code,
        failed => failed,
    }
}

fn handle_describe(args: &DescribeArgs) -> i32 {
    let workspace = match load_workspace(args.path.as_deref(), &args.workspace) {
        Ok(workspace) => workspace,
        Err(code) => return code,
    };

    let module = match &args.module {
        Some(coordinate) => workspace.project_by(coordinate),
        None => workspace.current_module(),
    };
    let Some(module) = module else {
        match &args.module {
            Some(coordinate) => error!("Module {} is not part of the workspace", coordinate),
            None => error!("No current module"),
        }
        return 1;
    };

    let descriptor = match module.to_module_descriptor() {
        Ok(descriptor) => descriptor,
        Err(e) => {
            error!("Failed to describe {}: {}", module.coordinate(), error_chain(&e));
            return 1;
        }
    };

    let formatter = OutputFormatter::new(args.format.into());
    print_output(formatter.format_descriptor(&DescriptorReport::from_descriptor(&descriptor)))
}

/// Discovers the workspace around `path`, reporting failures and mapping them to exit code 1
fn load_workspace(path: Option<&Path>, args: &WorkspaceArgs) -> Result<Workspace, i32> {
    let start = match path {
        Some(path) => path.to_path_buf(),
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                error!("Failed to get current directory: {}", e);
                return Err(1);
            }
        },
    };

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::new());
    let start: PathBuf = match fs.canonicalize(&start) {
        Ok(path) => path,
        Err(e) => {
            error!("Path does not exist: {} ({})", start.display(), e);
            return Err(1);
        }
    };
    debug!("Starting path: {}", start.display());

    let mut config = args.to_config();
    if let Some(root) = config.root_project_dir.take() {
        config.root_project_dir = Some(fs.canonicalize(&root).unwrap_or(root));
    }
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your MVNSPACE_* environment variables and command-line arguments.");
        return Err(1);
    }

    WorkspaceLoader::new(fs, config)
        .load_workspace(&start)
        .map_err(|e| {
            error!("{}", error_chain(&e));
            1
        })
}

fn print_output(output: anyhow::Result<String>) -> i32 {
    match output {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}
