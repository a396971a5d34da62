//! Headless driver: load a property file, solve its intervals on the worker
//! pool, log a summary, and render one offscreen frame plus a center pick
//! when a GPU adapter is available.
//!
//! Usage: `drillscope <property.json> [options.toml]`

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use drillscope::data::Property;
use drillscope::error::DrillscopeError;
use drillscope::gpu::render_context::RenderContext;
use drillscope::gpu::shader_composer::ShaderComposer;
use drillscope::options::Options;
use drillscope::renderer::picking::{PickTarget, Picking};
use drillscope::renderer::{
    CameraUniform, IntervalMesh, IntervalRenderer, SceneBindings,
};
use drillscope::scene::IntervalScene;
use glam::Vec3;

const LOAD_TIMEOUT: Duration = Duration::from_secs(300);
const FRAME_SIZE: (u32, u32) = (512, 512);

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let mut args = std::env::args().skip(1);
    let Some(property_path) = args.next() else {
        log::error!("usage: drillscope <property.json> [options.toml]");
        return ExitCode::from(2);
    };
    let options_path = args.next();

    match run(Path::new(&property_path), options_path.as_deref().map(Path::new))
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(
    property_path: &Path,
    options_path: Option<&Path>,
) -> Result<(), DrillscopeError> {
    let options = match options_path {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };
    let property = Property::load(property_path)?;
    let intervals = property.intervals();
    log::info!(
        "{}: {} holes, {} intervals, {} survey segments",
        property_path.display(),
        property.holes.len(),
        intervals.len(),
        property.survey_segments().len()
    );

    let mut scene = IntervalScene::new(&options);
    let _ = scene.load(&intervals)?;
    scene.wait_loaded(LOAD_TIMEOUT)?;
    log_summary(&scene);

    match pollster::block_on(RenderContext::headless()) {
        Ok(context) => {
            log::info!(
                "wide (32-bit) index support: {}",
                context.supports_wide_indices()
            );
            render_frame(&context, &mut scene, &options, &property)
        }
        Err(e) => {
            log::warn!("no GPU available, skipping offscreen render: {e}");
            Ok(())
        }
    }
}

fn log_summary(scene: &IntervalScene) {
    let Some(buffer) = scene.buffer() else {
        return;
    };
    let widths = buffer
        .extents()
        .iter()
        .enumerate()
        .filter(|&(i, _)| buffer.record(i).is_some_and(|r| !r.is_hidden()))
        .map(|(_, &[_, width])| width);
    let (min, max) = widths.fold((f32::INFINITY, f32::NEG_INFINITY), |acc, w| {
        (acc.0.min(w), acc.1.max(w))
    });
    log::info!(
        "{} instances ({} hidden), template {} vertices",
        buffer.capacity(),
        buffer.hidden_count(),
        scene.template().vertex_count()
    );
    if min <= max {
        log::info!("width range {min:.2} ..= {max:.2}");
    }
}

fn render_frame(
    context: &RenderContext,
    scene: &mut IntervalScene,
    options: &Options,
    property: &Property,
) -> Result<(), DrillscopeError> {
    let Some(buffer) = scene.buffer() else {
        return Ok(());
    };
    let mesh = IntervalMesh::assemble(context, scene.template(), buffer)?;

    let min = Vec3::from_array(property.bounds.min);
    let max = Vec3::from_array(property.bounds.max);
    let camera = CameraUniform::framing(
        (min + max) * 0.5,
        (max - min).length() * 0.5,
        FRAME_SIZE.0 as f32 / FRAME_SIZE.1 as f32,
    );
    let bindings = SceneBindings::new(
        &context.device,
        &camera,
        &options.display.uniforms(),
    );

    let mut composer = ShaderComposer::new()?;
    let renderer = IntervalRenderer::new(context, &bindings, &mut composer)?;
    let mut picking =
        Picking::new(context, &bindings, &mut composer, FRAME_SIZE)?;

    let center = (FRAME_SIZE.0 / 2, FRAME_SIZE.1 / 2);
    let mut encoder = context.create_encoder();
    let _frame = renderer.render_offscreen(
        context,
        &mut encoder,
        &bindings,
        &mesh,
        FRAME_SIZE,
    );
    picking.render(&mut encoder, &bindings, &mesh, center);
    context.submit(encoder);
    picking.start_readback();

    let Some(texel) = picking.wait_readback(&context.device) else {
        log::warn!("picking readback did not resolve");
        return Ok(());
    };
    match scene.resolve_pick(texel) {
        PickTarget::Interval { id, index } => {
            match property.label(id) {
                Some(label) => log::info!(
                    "center pick: interval {id} on {} ({:.1}..{:.1}, value \
                     {})",
                    label.hole,
                    label.from,
                    label.to,
                    label.value
                ),
                None => log::info!("center pick: interval {id}"),
            }
            scene.set_hovered(Some(index))?;
            scene.flush_bit_updates(&mesh, &context.queue)?;
        }
        PickTarget::None => log::info!("center pick: background"),
    }
    Ok(())
}
