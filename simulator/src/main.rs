use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};
use status_bridge::bridge::StatusBridge;
use std::path::PathBuf;
use std::thread;
use tagsimcore::scheduler::{Scheduler, SchedulerHandle};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::HarnessConfig;
use workflow::runner::{Mode, Runner};

mod generator;
mod link;
mod status_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Radio-tag tracking payload emulator for ground-station testing")]
struct Args {
    /// Pulse source
    #[arg(value_enum, default_value_t = Mode::SimulatePulse)]
    mode: Mode,
    /// Load a harness config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Serve session status over HTTP
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn parse_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    }
}

/// Stops the scheduler on Ctrl+C.
fn watch_for_interrupt(handle: SchedulerHandle) -> anyhow::Result<()> {
    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating runtime for signal handling")?;
    thread::spawn(move || {
        match runtime.block_on(async { signal::ctrl_c().await }) {
            Ok(()) => {
                info!("interrupt received, shutting down");
                handle.stop();
            }
            Err(err) => error!("cannot listen for Ctrl+C: {}", err),
        }
    });
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = parse_args();

    let config = if let Some(path) = args.config {
        HarnessConfig::load(path)?
    } else {
        HarnessConfig::default()
    };

    let scheduler = Scheduler::new();
    watch_for_interrupt(scheduler.handle())?;

    let bridge = args.serve.then(|| StatusBridge::serve(config.status.bind));
    let runner = Runner::new(config);

    info!("starting in {} mode", args.mode.as_str());
    let summary = runner.execute(args.mode, &scheduler, bridge.as_ref())?;

    println!(
        "Stopped after {} ticks -> acks {}, failures {}, pulses {}, ingested bytes {}",
        summary.ticks,
        summary.metrics.acks_sent,
        summary.metrics.command_failures,
        summary.metrics.pulses_emitted,
        summary.metrics.bytes_ingested
    );

    Ok(())
}
