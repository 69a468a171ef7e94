//! Backend capability interface for vellum.
//!
//! Everything vellum knows about a GPU passes through the [`RenderBackend`]
//! trait defined here. Platform backends (desktop GL, GLES, DirectX-class APIs)
//! implement it outside this workspace; this crate ships the two that do not
//! need a window.
//!
//! # Overview
//!
//! - [`RenderBackend`] - Trait abstracting GPU operations
//! - [`NullBackend`] - Accepts every call and draws nothing
//! - `RecordingBackend` - Records calls for verification (requires `mock` feature)
//! - Handle and value types (`BufferHandle`, `UniformValue`, ...)
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use vellum_backend::{BackendCall, RecordingBackend, RenderBackend};
//!
//! let mock = RecordingBackend::new();
//! let texture = mock.create_texture();
//! mock.delete_texture(texture);
//!
//! assert_eq!(mock.count(|c| matches!(c, BackendCall::DeleteTexture(_))), 1);
//! assert_eq!(mock.live_count(), 0);
//! # }
//! ```
//!
//! # Object Safety
//!
//! `RenderBackend` is object-safe, so higher layers hold an
//! `Arc<dyn RenderBackend>` and work the same against real and mock backends.

pub mod backend;
pub mod gpu_types;
pub mod null;
#[cfg(feature = "mock")]
pub mod recording;

pub use backend::RenderBackend;
pub use gpu_types::*;
pub use null::NullBackend;
#[cfg(feature = "mock")]
pub use recording::{BackendCall, RecordingBackend};
