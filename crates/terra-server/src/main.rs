use anyhow::Result;
use clap::Parser;
use terra_server::{bootstrap, init_tracing, spawn_event_logger, AppConfig};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "terra.toml")]
    config: String,

    /// Run one scan and one health update, then exit
    #[arg(long)]
    once: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(&args.config)?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    init_tracing(&config.logging)?;
    tracing::info!("Starting TERRA monitor with config: {}", args.config);

    let state = bootstrap(config).await?;
    let logger = spawn_event_logger(&state.event_bus);
    let orchestrator = state.orchestrator.clone();

    if args.once {
        let report = orchestrator.run_scan().await?;
        orchestrator.run_health_tick().await?;
        tracing::info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "Single pass finished"
        );
    } else {
        orchestrator.start_monitoring().await?;
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown signal received");
        orchestrator.stop_monitoring().await?;
    }

    // 让日志任务输出剩余事件
    tokio::task::yield_now().await;
    logger.abort();
    Ok(())
}
