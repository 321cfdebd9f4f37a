//! # hellobench-core
//!
//! Measure what an HTTP serving stack costs on top of a fixed amount of work.
//!
//! One route, `GET /hello`, answered with `hello world` by one of several
//! interchangeable [`Adapter`]s. Before responding, every adapter runs the
//! same [`workload`] so the only variable between runs is the binding
//! itself. A background [`sampler`] prints one memory snapshot after a fixed
//! delay.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hellobench_core::{Adapter, Config, sampler};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_args(["default", "0", "8080", "20"]));
//! sampler::schedule(config.sampling_delay, |sample| {
//!     if let Ok(sample) = sample {
//!         println!("{}", sample);
//!     }
//! })?;
//! Adapter::resolve(&config.adapter)?.start(config)?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod alloc;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod sampler;
pub mod workload;

pub use adapters::Adapter;
pub use config::Config;
pub use error::{BenchError, BenchResult};
pub use sampler::Sample;
pub use workload::Workload;
