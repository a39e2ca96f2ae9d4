use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use publish_adapters::PublishOutcome;
use publishflow::{app, AppConfig};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "publishflow", version, about = "Durable draft-to-repository publish pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Trigger a publish run for a draft id
    Publish {
        draft_id: String,
        /// Print the final outcome instead of only the acknowledgement
        #[arg(long)]
        wait: bool,
    },
    /// Re-deliver the trigger of an existing run (resumes or returns the recorded outcome)
    Redeliver { run_id: Uuid },
    /// Show the outcome of a run without executing anything
    Status {
        run_id: Uuid,
        /// Also print the run's event history
        #[arg(long)]
        events: bool,
    },
    /// Preview the markdown document projected from a draft JSON file
    Project { draft: PathBuf },
}

// `log` de las librerías llega vía el puente tracing-log del subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(filter)
                                  .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
                                  .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_for(outcome: &PublishOutcome) -> ExitCode {
    match outcome {
        PublishOutcome::Completed { .. } => ExitCode::SUCCESS,
        PublishOutcome::Failed { step, kind, .. } => {
            eprintln!("Publish failed at {step}: {kind}");
            ExitCode::from(2)
        }
        PublishOutcome::InProgress => ExitCode::from(3),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish { draft_id, wait } => {
            let cfg = AppConfig::from_env()?;
            let publisher = app::publisher(&cfg)?;
            let ack = publisher.trigger(&draft_id)?;
            print_json(&ack)?;
            // El run se completa antes de salir aunque no se pida el resultado.
            let outcome = publisher.wait(ack.run_id).await?;
            if wait {
                print_json(&outcome)?;
            }
            Ok(exit_for(&outcome))
        }
        Commands::Redeliver { run_id } => {
            let cfg = AppConfig::from_env()?;
            let outcome = app::publisher(&cfg)?.redeliver(run_id).await?;
            print_json(&outcome)?;
            Ok(exit_for(&outcome))
        }
        Commands::Status { run_id, events } => {
            let cfg = AppConfig::from_env()?;
            let publisher = app::status_publisher(&cfg)?;
            let outcome = publisher.outcome(run_id)?;
            print_json(&outcome)?;
            if events {
                for ev in publisher.engine().events_for(run_id)? {
                    println!("{:>6} {} {}", ev.seq, ev.ts.to_rfc3339(), serde_json::to_string(&ev.kind)?);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Project { draft } => {
            let doc = app::preview(&draft)?;
            eprintln!("path: {}", doc.path);
            println!("{}", doc.body);
            Ok(ExitCode::SUCCESS)
        }
    }
}
