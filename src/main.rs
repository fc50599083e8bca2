mod engine;
mod render;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use tracing_subscriber::EnvFilter;

use vulkano::sync;
use vulkano::sync::GpuFuture;

use winit::event::KeyboardInput;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use crate::engine::obj;
use crate::engine::{
    ColorGenerator, Engine, FrameUpdate, InputEvent, InputManager, Mesh, ModelTransform,
    NormalMode, RenderMode,
};
use crate::render::{MeshBuffers, Render};

/// Interactive viewer for triangulated Wavefront OBJ meshes.
///
/// Keys: L R U D F B move the model (rotate while caps lock is on),
/// 1-4 switch between points, wireframe, faces and faces with wireframe,
/// C picks a new wireframe color, Escape quits.
#[derive(Debug, Parser)]
#[command(name = "objview", version)]
struct Args {
    /// Path to the .obj file
    path: PathBuf,

    /// How normals of vertices shared between faces are combined
    #[arg(long, value_enum, default_value_t = NormalMode::Averaged)]
    normals: NormalMode,

    /// Render mode at startup (1 points, 2 wireframe, 3 faces, 4 faces+wireframe)
    #[arg(long, default_value = "2", value_parser = parse_mode)]
    mode: RenderMode,

    /// Seed for the random colors, for reproducible screenshots
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_mode(value: &str) -> Result<RenderMode, Box<dyn std::error::Error + Send + Sync>> {
    let number: u8 = value.parse()?;
    Ok(RenderMode::try_from(number)?)
}

fn parse_args<I, T>(args: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args)
}

// First line of clap's message, without its usage and help hints.
fn usage_error_reason(err: &clap::Error) -> String {
    err.to_string().lines().next().unwrap_or_default().to_string()
}

fn draw_frame(
    render: &mut Render,
    buffers: &mut MeshBuffers,
    engine: &Engine,
    update: FrameUpdate,
    previous_frame_end: &mut Option<Box<dyn GpuFuture>>,
) -> Result<()> {
    if update.flat_color_changed {
        render.upload_flat_color(buffers, engine.flat_color)?;
    }

    render.start()?;
    render.draw(
        buffers,
        engine.mode.passes(),
        engine.transform.model_matrix_raw(),
    )?;
    render.finish(previous_frame_end)
}

fn main() -> Result<()> {
    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            eprintln!("{}", usage_error_reason(&err));
            println!("{}", Args::command().render_usage());
            std::process::exit(1);
        }
    };

    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let obj = obj::load_obj(&args.path)?;
    let mesh = Mesh::from_obj(obj, args.normals)?;

    let isolated = mesh
        .normals()
        .iter()
        .filter(|normal| **normal == nalgebra_glm::Vec3::zeros())
        .count();
    tracing::info!(
        path = %args.path.display(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        edges = mesh.edges().len(),
        isolated,
        "mesh loaded"
    );

    let colors = match args.seed {
        Some(seed) => ColorGenerator::seeded(seed),
        None => ColorGenerator::new(),
    };
    let mut engine = Engine::new(
        mesh,
        args.mode,
        colors,
        ModelTransform::new(render::ASPECT_RATIO),
    );

    // Render setup
    let event_loop = EventLoop::new();
    let title = format!("objview - {}", args.path.display());
    let mut render = Render::new(&event_loop, &title, &engine.transform)?;
    let mut buffers =
        render.create_mesh_buffers(&engine.mesh, &engine.vertex_colors, engine.flat_color)?;

    tracing::info!(mode = %engine.mode, "viewer ready");

    let mut input_manager = InputManager::new();
    let mut previous_frame_end =
        Some(Box::new(sync::now(render.device.clone())) as Box<dyn GpuFuture>);

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => {
                input_manager.on_event(InputEvent::from_event_state(state, keycode));
            }

            WindowEvent::Focused(false) => {
                input_manager.release_all();
            }

            WindowEvent::CloseRequested => {
                *control_flow = ControlFlow::Exit;
            }

            WindowEvent::Resized(_) => {
                if let Err(err) = render.recreate_swapchain() {
                    tracing::error!("failed to recreate swapchain: {err:?}");
                    *control_flow = ControlFlow::ExitWithCode(1);
                }
            }

            _ => {}
        },

        Event::RedrawEventsCleared => {
            render.window().request_redraw();
        }

        Event::RedrawRequested(_) => {
            if let Some(future) = previous_frame_end.as_mut() {
                future.cleanup_finished();
            }

            let update = engine.tick(&input_manager.snapshot());
            if update.quit {
                *control_flow = ControlFlow::Exit;
                return;
            }

            if let Err(err) = draw_frame(
                &mut render,
                &mut buffers,
                &engine,
                update,
                &mut previous_frame_end,
            ) {
                tracing::error!("frame failed: {err:?}");
                *control_flow = ControlFlow::ExitWithCode(1);
            }
        }

        _ => (),
    });
}
