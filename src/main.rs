//! Equilibrium CLI binary

use anyhow::Context;
use clap::Parser;
use equilibrium::cli::{Cli, Commands, EquilibriumApp, TableArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Demo {
            table,
            strategy,
            latency_ms,
        } => {
            let app = EquilibriumApp::new(config_path, &table).context("invalid configuration")?;
            app.demo(strategy, latency_ms)
                .await
                .context("demo episode failed")?;
        }

        Commands::Simulate {
            table,
            episodes,
            strategy,
            tracking_dir,
            experiment,
            run_name,
            export,
        } => {
            let app = EquilibriumApp::new(config_path, &table).context("invalid configuration")?;
            tracing::info!("Simulating {} episodes with {} strategies", episodes, strategy);
            app.simulate(
                strategy,
                episodes,
                tracking_dir,
                &experiment,
                run_name.as_deref(),
                export.as_deref(),
            )
            .await
            .context("simulation failed")?;
        }

        Commands::Serve {
            host,
            port,
            latency_ms,
        } => {
            let app = EquilibriumApp::new(config_path, &TableArgs::default())
                .context("invalid configuration")?;
            tracing::info!("Starting session server on {}:{}", host, port);
            app.serve(&host, port, latency_ms)
                .await
                .context("session server stopped")?;
        }
    }

    Ok(())
}
