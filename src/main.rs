use std::thread;

use anyhow::Context;
use clap::Parser;
use futures::channel::mpsc;
use maestro_demo::{cli::Args, read_lines, Controller, Dispatcher, MotionPattern, SerialTransport};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Standard input on its own thread, so a blocked read never holds up shutdown.
fn stdin_lines() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded();
    thread::spawn(move || {
        for line in read_lines(std::io::stdin().lock()) {
            if tx.unbounded_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = args.config().context("invalid configuration")?;
    let transport = SerialTransport::open(&args.port, args.baud, args.timeout(), args.protocol())
        .with_context(|| format!("failed to open {}", args.port))?;

    let channels: Vec<String> = config.channels.iter().map(|c| c.to_string()).collect();
    println!("Enabled channels: {}", channels.join(", "));
    println!(
        "Enter an angle ({}-{}) or '{}' for demo mode (one cycle takes {:.1}s)",
        config.mapper.min_angle,
        config.mapper.max_angle,
        config.demo_trigger,
        MotionPattern::cycle_duration(&config).as_secs_f32()
    );

    let dispatcher = match args.seed {
        Some(seed) => Dispatcher::with_seed(config, seed),
        None => Dispatcher::new(config),
    };
    let mut controller = Controller::with_dispatcher(transport, dispatcher);
    controller.report_errors().await?;

    let interrupted = tokio::select! {
        result = controller.run(stdin_lines()) => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
            true
        }
    };

    // At end of input the last commanded angle stays; a demo has already recentered.
    if interrupted {
        controller.park().await?;
    }
    for (channel, position) in controller.positions().await {
        match position {
            Ok(target) => println!("Channel {} position: {}", channel, target),
            Err(e) => warn!("Failed to get position for channel {}: {}", channel, e),
        }
    }

    Ok(())
}
