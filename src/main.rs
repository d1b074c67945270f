use anyhow::{Context, Result};
use clap::Parser;
use lumagen::capabilities::Capabilities;
use lumagen::cli::{Cli, Commands, LoadSourceArgs, ProcessSceneArgs, ProjectArgs, RunArgs};
use lumagen::config::PipelineConfig;
use lumagen::source::SourceLoader;
use lumagen::types::AspectRatio;
use lumagen::workflow::{ExecutorConfig, JobInput, StoreRegistry, WorkflowExecutor};

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.debug()).map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;
    let config = PipelineConfig::from_env();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let succeeded = runtime.block_on(async {
        match cli.command {
            Commands::Run(args) => run(args, &config).await,
            Commands::Clear(args) => clear(args, &config).await,
            Commands::LoadSource(args) => load_source(args, &config).await,
            Commands::ProcessScene(args) => process_scene(args, &config).await,
        }
    })?;

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn executor(project: &str, debug: bool, config: &PipelineConfig) -> Result<WorkflowExecutor> {
    let caps = Capabilities::from_config(config).map_err(anyhow::Error::msg)?;
    let registry = StoreRegistry::new(&config.state_dir, &config.output_dir);
    Ok(WorkflowExecutor::new(
        registry.open(project),
        caps,
        ExecutorConfig {
            scene_concurrency: config.scene_concurrency,
            scene_batch_size: config.scene_batch_size,
            aspect_ratio: AspectRatio::Portrait,
            retry: config.retry.clone(),
            debug,
        },
    ))
}

async fn run(args: RunArgs, config: &PipelineConfig) -> Result<bool> {
    let loader = SourceLoader::new(&config.source_dir);
    let (source_text, _) = loader
        .load(&args.project, &args.source, args.overwrite)
        .await
        .context("loading source material")?;

    let executor = executor(&args.project, args.debug, config)?;
    let report = executor
        .run(&JobInput {
            source_text,
            duration_seconds: args.duration,
        })
        .await;

    println!("{}", report.summary());
    Ok(report.is_success())
}

async fn clear(args: ProjectArgs, config: &PipelineConfig) -> Result<bool> {
    let registry = StoreRegistry::new(&config.state_dir, &config.output_dir);
    registry
        .open(&args.project)
        .clear()
        .await
        .with_context(|| format!("clearing project {}", args.project))?;
    println!("State cleared for project {}", args.project);
    Ok(true)
}

async fn load_source(args: LoadSourceArgs, config: &PipelineConfig) -> Result<bool> {
    let loader = SourceLoader::new(&config.source_dir);
    let (content, path) = loader
        .load(&args.project, &args.source, args.overwrite)
        .await
        .context("loading source material")?;
    println!(
        "Loaded {} characters into {}",
        content.chars().count(),
        path.display()
    );
    Ok(true)
}

async fn process_scene(args: ProcessSceneArgs, config: &PipelineConfig) -> Result<bool> {
    let executor = executor(&args.project, args.debug, config)?;
    let scene = executor
        .process_scene_by_id(&args.scene_id)
        .await
        .with_context(|| format!("processing scene {}", args.scene_id))?;
    println!(
        "Scene {} ({}) done: {}",
        scene.scene_index + 1,
        scene.id,
        scene.final_video_path.as_deref().unwrap_or("-")
    );
    Ok(true)
}

// Logging configuration: RUST_LOG wins, then --debug, then the build profile.
fn init_logging(debug: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if debug || cfg!(debug_assertions) {
            "info,lumagen=debug,reqwest=info,hyper=info".to_string()
        } else {
            "info,lumagen=info,reqwest=warn,hyper=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        // JSON logging for log aggregation
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_file(debug)
            .with_line_number(debug)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("🎬 lumagen {} starting, log level: {}", env!("CARGO_PKG_VERSION"), log_level);
    Ok(())
}
