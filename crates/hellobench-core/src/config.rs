use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;

use crate::workload::Workload;

/// Adapter used when no name is given.
pub const DEFAULT_ADAPTER: &str = "default";

/// Port used when none is given or the argument does not parse.
pub const DEFAULT_PORT: u16 = 8080;

/// Seconds between process start and the memory snapshot.
pub const DEFAULT_SAMPLING_DELAY_SECS: u64 = 20;

/// The single route every adapter serves.
pub const ROUTE_PATH: &str = "/hello";

/// Response body written by every adapter.
pub const PAYLOAD: &[u8] = b"hello world";

/// Run parameters, parsed once at startup and shared read-only afterwards.
///
/// Handlers receive it through an `Arc<Config>` captured by their closure
/// (or axum state); nothing ever mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Registry name of the binding to start.
    pub adapter: String,

    /// Work performed by every request before responding.
    pub workload: Workload,

    /// TCP port, bound on all IPv4 interfaces.
    pub port: u16,

    /// Delay before the one-shot memory snapshot.
    pub sampling_delay: Duration,

    /// Body written verbatim by the handler. Static, so clones are a
    /// pointer copy.
    pub payload: Bytes,
}

impl Config {
    /// Build a config from the four optional positional arguments.
    ///
    /// Numeric arguments that fail to parse keep their default. The failure
    /// is only visible at `debug` level.
    pub fn from_parts(
        adapter: Option<&str>,
        workload: Option<&str>,
        port: Option<&str>,
        sampling_delay: Option<&str>,
    ) -> Self {
        let mut config = Config::default();

        if let Some(name) = adapter {
            config.adapter = name.to_string();
        }
        if let Some(ms) = parse_or_keep::<i64>("workload", workload) {
            config.workload = Workload::from_millis(ms);
        }
        if let Some(port) = parse_or_keep::<u16>("port", port) {
            config.port = port;
        }
        if let Some(secs) = parse_or_keep::<u64>("sampling delay", sampling_delay) {
            config.sampling_delay = Duration::from_secs(secs);
        }
        config
    }

    /// Build a config from positional arguments, left to right.
    /// Anything after the fourth argument is ignored.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().take(4).collect();
        let arg = |i: usize| args.get(i).map(AsRef::<str>::as_ref);
        Config::from_parts(arg(0), arg(1), arg(2), arg(3))
    }

    /// Override the sampling delay with sub-second precision.
    pub fn with_sampling_delay(mut self, delay: Duration) -> Self {
        self.sampling_delay = delay;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_workload(mut self, workload: Workload) -> Self {
        self.workload = workload;
        self
    }

    /// `0.0.0.0:<port>`.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn cpu_bound(&self) -> bool {
        self.workload.is_cpu_bound()
    }

    pub fn cpu_target(&self) -> u32 {
        self.workload.cpu_target()
    }

    pub fn sleep_duration(&self) -> Duration {
        self.workload.sleep_duration()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            adapter: DEFAULT_ADAPTER.to_string(),
            workload: Workload::default(),
            port: DEFAULT_PORT,
            sampling_delay: Duration::from_secs(DEFAULT_SAMPLING_DELAY_SECS),
            payload: Bytes::from_static(PAYLOAD),
        }
    }
}

fn parse_or_keep<T: FromStr>(what: &str, raw: Option<&str>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::debug!("ignoring unparsable {} argument {:?}", what, raw);
            None
        }
    }
}
