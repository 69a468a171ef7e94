//! Profiling utilities based on the `puffin` crate.
//!
//! With the `profiling` feature disabled, [`profile_function`] and [`profile_scope`]
//! expand to nothing so call sites never need their own `cfg`.

use crate::config::ProfilingMode;

#[cfg(feature = "profiling")]
pub use puffin::{profile_function, profile_scope};

#[cfg(not(feature = "profiling"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __vellum_profile_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "profiling"))]
pub use crate::__vellum_profile_noop as profile_function;
#[cfg(not(feature = "profiling"))]
pub use crate::__vellum_profile_noop as profile_scope;

/// Address the puffin HTTP server binds to.
pub const PUFFIN_ADDR: &str = "0.0.0.0:8585";

#[cfg(feature = "profiling")]
static PROFILING_SERVER: std::sync::OnceLock<puffin_http::Server> = std::sync::OnceLock::new();

static PROFILING_MODE: std::sync::OnceLock<ProfilingMode> = std::sync::OnceLock::new();

/// Initialize profiling for the given mode.
///
/// Profiling state is process-wide, so only the first call has an effect. Later calls
/// are ignored and return `false`; [`profiling_mode`] reports the mode in use.
///
/// # Example
/// ```no_run
/// use vellum_core::profiling::init_profiling;
/// use vellum_core::ProfilingMode;
///
/// init_profiling(ProfilingMode::WithWebserver);
/// ```
pub fn init_profiling(mode: ProfilingMode) -> bool {
    if PROFILING_MODE.set(mode).is_err() {
        tracing::trace!(
            requested = ?mode,
            active = ?PROFILING_MODE.get(),
            "profiling already initialized"
        );
        return false;
    }
    start(mode);
    true
}

/// The mode profiling was initialized with, if it has been.
pub fn profiling_mode() -> Option<ProfilingMode> {
    PROFILING_MODE.get().copied()
}

#[cfg(feature = "profiling")]
fn start(mode: ProfilingMode) {
    puffin::set_scopes_on(mode.is_enabled());

    if mode != ProfilingMode::WithWebserver {
        return;
    }

    match puffin_http::Server::new(PUFFIN_ADDR) {
        Ok(server) => {
            tracing::info!("Puffin profiler server started on http://{PUFFIN_ADDR}");
            let _ = PROFILING_SERVER.set(server);
        }
        Err(e) => {
            tracing::error!("Failed to start puffin server: {}", e);
        }
    }
}

#[cfg(not(feature = "profiling"))]
fn start(mode: ProfilingMode) {
    if mode.is_enabled() {
        tracing::warn!("profiling requested but the `profiling` feature is disabled");
    }
}

/// Mark the start of a new frame for profiling.
///
/// `Surface::present` calls this once per frame.
#[inline]
pub fn new_frame() {
    #[cfg(feature = "profiling")]
    puffin::GlobalProfiler::lock().new_frame();
}
