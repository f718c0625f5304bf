use std::error::Error;
use std::path::PathBuf;

use futures::StreamExt;
use systempulse::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

// Usage: cargo run --example poll_cycle -- <payload.json> [config.json]
#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    fmt().with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))).init();

    let mut args = std::env::args().skip(1);
    let payload = PathBuf::from(args.next().unwrap_or_else(|| "metrics.json".to_string()));
    let config = match args.next() {
        Some(path) => Config::load(std::path::Path::new(&path))?,
        None => Config::new(std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)),
    };

    println!("SystemPulse Poll Cycle Example");
    println!("==============================");
    println!("Feed: {}", payload.display());
    println!("Interval: {:?}, cores: {}, top {}", config.poll_interval(), config.cores(), config.limit());

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.cancel();
        }
    });

    let cycle = PollCycle::new(config, FileFeed::new(payload))?.with_sink(LogSink);
    let mut updates = Box::pin(cycle.spawn(cancel).into_stream());

    while let Some(output) = updates.next().await {
        println!("\nBatch fetched at {}{}", output.fetched_at, if output.stale { " (stale)" } else { "" });

        if let Some(uptime) = output.uptime {
            println!("Uptime: {}", uptime);
        }

        for family in output.series.families() {
            if let Some(record) = output.series.get(family).last() {
                let fields: Vec<String> = record.fields.iter().map(|(k, v)| format!("{k}={v}")).collect();
                println!("{:<18} {} {}", family, record.label, fields.join(" "));
            }
        }

        println!("\n{:>8}  {:<24} {:>6} {:>6}", "PID", "NAME", "CPU%", "MEM%");
        for process in &output.processes {
            println!("{:>8}  {:<24} {:>6.1} {:>6.1}", process.pid, process.name, process.cpu_pct, process.mem_pct);
        }

        if output.dropped > 0 {
            println!("({} malformed records dropped)", output.dropped);
        }
    }

    println!("\nStopped.");
    Ok(())
}
