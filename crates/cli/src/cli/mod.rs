pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, DescribeArgs, DiscoverArgs, LocateArgs, WorkspaceArgs};
pub use output::{OutputFormat, OutputFormatter};
