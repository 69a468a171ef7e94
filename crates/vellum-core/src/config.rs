use std::borrow::Cow;

use crate::logging::DEFAULT_FILTER;

/// Configuration shared by every vellum crate.
#[derive(Debug, Clone)]
pub struct Config {
    pub profiling: ProfilingMode,
    /// `tracing` env-filter directive used when `RUST_LOG` is unset.
    pub log_filter: Cow<'static, str>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            profiling: ProfilingMode::Off,
            log_filter: Cow::Borrowed(DEFAULT_FILTER),
        }
    }
}

impl Config {
    pub fn with_profiling(mut self, profiling: ProfilingMode) -> Self {
        self.profiling = profiling;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<Cow<'static, str>>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingMode {
    /// Profiling scopes are compiled in but disabled
    #[default]
    Off,
    /// Scopes are recorded and can be read back in-process
    On,
    /// Scopes are recorded and served to `puffin_viewer` over HTTP
    WithWebserver,
}

impl ProfilingMode {
    pub fn is_enabled(self) -> bool {
        !matches!(self, ProfilingMode::Off)
    }
}
