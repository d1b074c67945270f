// cli.rs - Command-line surface
use clap::{Args, Parser, Subcommand};

/// Turn source material into a narrated short-form video.
#[derive(Debug, Parser)]
#[command(name = "lumagen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the whole workflow, resuming from any saved state.
    Run(RunArgs),
    /// Delete the saved state and working files of a project.
    Clear(ProjectArgs),
    /// Fetch and cache source material without running the workflow.
    #[command(name = "load_source", alias = "load-source")]
    LoadSource(LoadSourceArgs),
    /// Reprocess a single scene, then recompose if everything is done.
    #[command(name = "process_scene", alias = "process-scene")]
    ProcessScene(ProcessSceneArgs),
}

#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project name; also the job id.
    #[arg(long, alias = "project-name")]
    pub project: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(long, alias = "project-name")]
    pub project: String,
    /// URL, file path or inline markdown.
    #[arg(long)]
    pub source: String,
    /// Target video length in seconds.
    #[arg(long, default_value_t = crate::workflow::executor::DEFAULT_DURATION_SECS)]
    pub duration: u32,
    /// Keep temporary files and log at debug level.
    #[arg(long)]
    pub debug: bool,
    /// Reload the source even if a cached copy exists.
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct LoadSourceArgs {
    #[arg(long)]
    pub source: String,
    #[arg(long, alias = "project-name")]
    pub project: String,
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Args)]
pub struct ProcessSceneArgs {
    #[arg(long)]
    pub scene_id: String,
    #[arg(long, alias = "project-name")]
    pub project: String,
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    pub fn debug(&self) -> bool {
        match &self.command {
            Commands::Run(args) => args.debug,
            Commands::ProcessScene(args) => args.debug,
            Commands::Clear(_) | Commands::LoadSource(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults_duration() {
        let cli = Cli::parse_from(["lumagen", "run", "--project", "demo", "--source", "notes.md"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.project, "demo");
                assert_eq!(args.duration, 40);
                assert!(!args.debug && !args.overwrite);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_underscore_subcommands_and_legacy_flag() {
        let cli = Cli::parse_from([
            "lumagen",
            "process_scene",
            "--scene-id",
            "abc",
            "--project-name",
            "demo",
            "--debug",
        ]);
        assert!(cli.debug());
        match cli.command {
            Commands::ProcessScene(args) => {
                assert_eq!(args.scene_id, "abc");
                assert_eq!(args.project, "demo");
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["lumagen", "load_source", "--source", "x", "--project", "p", "--overwrite"]);
        assert!(matches!(cli.command, Commands::LoadSource(LoadSourceArgs { overwrite: true, .. })));
    }
}
