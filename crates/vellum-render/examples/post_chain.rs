//! Post-Processing Chain - headless walkthrough
//!
//! Builds a surface with three effects (the middle one disabled), draws a few shapes
//! including an instanced one, and presents several frames over the null backend.
//! Run with `RUST_LOG=debug` to see the per-frame summaries.

use std::sync::Arc;

use glam::Vec2;
use vellum_core::config::{Config, ProfilingMode};
use vellum_core::logging;
use vellum_render::backend::NullBackend;
use vellum_render::{
    Camera, Circle, Color, GraphicsContext, GraphicsContextDescriptor, LineSegment, Mesh, Paint,
    PostEffect, Rectangle, Shader, Surface, SurfaceDescriptor,
};

fn main() -> vellum_render::Result<()> {
    let config = Config::default().with_profiling(ProfilingMode::On);
    logging::init_with(&config);

    let ctx = GraphicsContext::new(
        Arc::new(NullBackend::new()),
        GraphicsContextDescriptor::new()
            .with_label("post-chain")
            .with_config(config),
    );
    let mut surface = Surface::new(
        ctx.clone(),
        SurfaceDescriptor::new(1280, 720)
            .with_scale_factor(Vec2::splat(2.0))
            .with_clear_color(Color::from_hex(0x1e1e2e)),
    );
    surface.add_camera(Camera::new(Vec2::ZERO));

    let effect_shader = Arc::new(Shader::effect(&ctx)?);
    let mut started = 0.0f32;
    surface.add_effect(PostEffect::new("bloom", effect_shader.clone()))?;
    let vignette = surface.add_effect(
        PostEffect::new("vignette", effect_shader.clone()).with_enabled(false),
    )?;
    surface.add_effect(PostEffect::new("scanlines", effect_shader).with_hook(
        move |ctx: &GraphicsContext, shader: &Shader| {
            started += 1.0 / 60.0;
            shader.set_uniform(ctx, "u_time", started);
        },
    ))?;

    for step in surface.effects().plan() {
        tracing::info!(effect = ?step.effect, destination = ?step.destination, "chain link");
    }

    let mesh_shader = Arc::new(Shader::mesh(&ctx)?);
    let mut panel = Mesh::from_provider(
        &ctx,
        &Rectangle::new(Vec2::new(300.0, 200.0)),
        mesh_shader.clone(),
    );
    panel.transform.position = Vec2::new(100.0, 100.0);

    let mut line = Mesh::from_provider(
        &ctx,
        &LineSegment::new(Vec2::ZERO, Vec2::new(400.0, 300.0), 4.0),
        mesh_shader.clone(),
    );

    let mut dots = Mesh::from_provider(&ctx, &Circle::new(6.0), mesh_shader);
    let instances = dots.enable_instancing(&ctx, 64);
    for i in 0..instances.count() {
        let at = Vec2::new((i % 8) as f32 * 40.0 + 600.0, (i / 8) as f32 * 40.0 + 200.0);
        instances.set_position(&ctx, i, at);
    }

    for frame in 0..4 {
        if frame == 2 {
            if let Some(effect) = surface.effect_mut(vignette) {
                effect.set_enabled(true);
            }
        }
        panel.transform.rotate(0.1);

        panel.draw(&surface, Paint::Color(Color::rgb(0.2, 0.6, 0.9)));
        line.draw(&surface, Paint::Wireframe(Color::WHITE));
        dots.draw(&surface, Paint::Color(Color::RED));

        let stats = surface.present();
        tracing::info!(
            frame = stats.frame,
            draws = stats.draw_calls,
            passes = stats.effect_passes,
            deleted = stats.deleted.deleted(),
            "presented"
        );
    }

    let world = surface.screen_to_world(Vec2::new(640.0, 360.0));
    tracing::info!(x = world.x, y = world.y, "screen centre in world space");

    drop(dots);
    surface.present();
    surface.dispose();
    Ok(())
}
