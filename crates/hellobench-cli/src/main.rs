//! hellobench
//!
//! ```text
//! hellobench [adapter] [workload-ms] [port] [sampling-delay-secs]
//!
//! hellobench                      # default adapter, yield, :8080, report after 20s
//! hellobench raw 10 8081          # raw adapter, 10ms sleep per request
//! hellobench reuseport -1 8082 5  # CPU-bound requests, report after 5s
//! ```

use std::sync::Arc;

use clap::Parser;
use hellobench_core::alloc::TrackingAllocator;
use hellobench_core::{Adapter, BenchError, Config, logging, sampler};
use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: TrackingAllocator<MiMalloc> = TrackingAllocator::new(MiMalloc);

/// Serve GET /hello through one HTTP binding and report memory once.
///
/// Positional, all optional: adapter, workload-ms, port, sampling-delay-secs.
/// Numeric arguments that do not parse keep their default; anything after
/// the fourth argument is ignored.
#[derive(Parser, Debug)]
#[command(name = "hellobench")]
#[command(version, about, long_about = None)]
struct Cli {
    /// [adapter] [workload-ms: -1 CPU-bound, 0 yield, >0 sleep] [port] [sampling-delay-secs]
    #[arg(
        value_name = "ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

const BANNER_RULE: &str = "--------------------------------------------------------------------";

fn print_unknown_adapter(err: &BenchError) {
    println!("{}", BANNER_RULE);
    for _ in 0..3 {
        println!("------------- Unknown framework given!!! -------------");
    }
    println!("{}", err);
    println!("{}", BANNER_RULE);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_args(&cli.args));

    // Runs independently of the adapter, measured from here.
    sampler::schedule(config.sampling_delay, |sample| match sample {
        Ok(sample) => {
            tracing::debug!("peak live bytes: {}", sample.peak_allocated);
            println!("{}", sample);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    })?;

    let adapter = match Adapter::resolve(&config.adapter) {
        Ok(adapter) => adapter,
        Err(e @ BenchError::UnknownAdapter { .. }) => {
            print_unknown_adapter(&e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    adapter.start(config)?;
    Ok(())
}
