//! Vellum Core
//!
//! Shared utilities for the vellum rendering layer: logging bootstrap, profiling
//! macros, math types, geometry primitives and configuration.

pub mod alloc;
pub mod config;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;

pub use config::{Config, ProfilingMode};
