use anyhow::bail;
use clap::Parser;
use synthmig::config::{Args, Command, RunArgs};
use synthmig::output::{check_artifact, collect_artifacts};
use synthmig::source::{FetchMonitors, FetchMonitorsReqwest};
use synthmig::validator::StrictValidator;
use synthmig::{Config, Migration, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Load configuration
    let config = Config::load(&args)?;

    // If --validate flag is set, exit successfully after config validation
    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.log_format)?;

    tracing::debug!("{:?}", args);

    match args.command.unwrap_or_else(|| Command::Run(RunArgs::default())) {
        Command::Run(run) => migrate(&config, run).await,
        Command::List { pattern } => list(&config, pattern.as_deref()).await,
        Command::Check { paths } => check(&config, &paths),
    }
}

async fn migrate(config: &Config, run: RunArgs) -> anyhow::Result<()> {
    let migration = Migration::from_config(config)?;
    let report = migration.run(run.pattern.as_deref(), run.limit).await?;

    println!();
    println!("Total monitors:     {}", report.total_monitors);
    println!("Successful:         {}", report.successful_migrations);
    println!("Failed:             {}", report.failed_migrations);
    println!("Lightweight (YAML): {}", report.monitor_stats.lightweight);
    println!("Journey (browser):  {}", report.monitor_stats.journey);
    for (archetype, count) in &report.monitor_stats.by_archetype {
        println!("  {archetype:<8} {count}");
    }
    Ok(())
}

async fn list(config: &Config, pattern: Option<&str>) -> anyhow::Result<()> {
    let source = FetchMonitorsReqwest::new(&config.source)?;
    let monitors = source.list_monitors(pattern).await?;

    for (index, monitor) in monitors.iter().enumerate() {
        let kind = monitor.monitor_type.as_ref().map_or("N/A".to_string(), |t| t.to_string());
        let status = if monitor.active { "active" } else { "inactive" };
        println!("{:>3}. {}  [{}] {} ({})", index + 1, monitor.guid, kind, monitor.name, status);
    }
    println!("{} monitors", monitors.len());
    Ok(())
}

fn check(config: &Config, paths: &[std::path::PathBuf]) -> anyhow::Result<()> {
    let validator = StrictValidator::new(&config.validation);
    let artifacts = collect_artifacts(paths)?;

    let mut failed = 0;
    for path in &artifacts {
        match check_artifact(&validator, path) {
            Ok(result) if result.is_valid() => println!("ok    {}", path.display()),
            Ok(result) => {
                failed += 1;
                println!("FAIL  {}", path.display());
                for violation in result.violations() {
                    println!("        - {violation}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("ERROR {}: {e}", path.display());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} artifacts failed validation", artifacts.len());
    }
    println!("{} artifacts valid", artifacts.len());
    Ok(())
}
