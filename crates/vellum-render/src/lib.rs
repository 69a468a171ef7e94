//! Vellum Render
//!
//! 2D rendering on top of a low-level [`RenderBackend`]. This crate sequences backend
//! calls and manages resource lifetimes; the backend itself is supplied by the platform.
//!
//! # Overview
//!
//! - [`GraphicsContext`]: shared handle to the backend, the deferred-deletion queues and
//!   the current-surface state. Everything takes it explicitly.
//! - [`Surface`]: projection, viewport, cameras and post-processing for one drawable area.
//! - [`Mesh`]: the drawable. Shapes ([`Rectangle`], [`Circle`], [`LineSegment`],
//!   [`TileLayer`]) are [`GeometryProvider`]s for it; [`Sprite`] wraps one with a texture.
//! - [`gc`]: GPU handle ownership. Dropping a resource from any thread queues its handle;
//!   queues are drained on the render thread by [`Surface::present`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glam::Vec2;
//! use vellum_render::{
//!     Circle, Color, GraphicsContext, Mesh, Paint, Shader, Surface, SurfaceDescriptor,
//! };
//!
//! # fn main() -> vellum_render::Result<()> {
//! let ctx = GraphicsContext::headless();
//! let mut surface = Surface::new(ctx.clone(), SurfaceDescriptor::new(640, 480));
//! let shader = Arc::new(Shader::mesh(&ctx)?);
//!
//! let mut ball = Mesh::from_provider(&ctx, &Circle::new(16.0), shader);
//! ball.transform.position = Vec2::new(320.0, 240.0);
//!
//! ball.draw(&surface, Paint::Color(Color::RED));
//! let stats = surface.present();
//! assert_eq!(stats.draw_calls, 1);
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod camera;
pub mod color;
pub mod context;
pub mod error;
pub mod gc;
pub mod instancing;
pub mod mesh;
pub mod post;
pub mod projection;
pub mod shader;
pub mod shapes;
pub mod sprite;
pub mod surface;
pub mod texture;
pub mod transform;

pub use buffer::{GpuBuffer, VertexArray};
pub use camera::{Camera, CameraId};
pub use color::Color;
pub use context::{GraphicsContext, GraphicsContextDescriptor};
pub use error::{RenderError, Result};
pub use gc::{DeletionQueues, DrainStats, GpuResource};
pub use instancing::{InstanceAttribute, InstanceBuffers};
pub use mesh::{Geometry, GeometryProvider, Mesh, Paint, UniformHook};
pub use post::{ChainStep, Destination, Effect, EffectChain, EffectId, PostEffect};
pub use projection::Projection;
pub use shader::{Shader, ShaderDescriptor, ShaderDialect, StageSources};
pub use shapes::{Circle, LineSegment, Rectangle, TileLayer};
pub use sprite::Sprite;
pub use surface::{FrameStats, Surface, SurfaceDescriptor};
pub use texture::{AlphaMode, ImageData, RenderTarget, Texture, TileSheet};
pub use transform::{Transform2D, compose_mvp};

pub use vellum_backend::{self as backend, RenderBackend};
