pub mod mesh_buffers;

use crate::engine::mesh::{Color, Mesh, Position};
use crate::engine::{DrawPass, ModelTransform};
pub use mesh_buffers::MeshBuffers;

use color_eyre::eyre::{Result, eyre};

use vulkano::buffer::{BufferUsage, CpuAccessibleBuffer, TypedBufferAccess};
use vulkano::command_buffer::allocator::StandardCommandBufferAllocator;
use vulkano::command_buffer::{
    AutoCommandBufferBuilder, CommandBufferUsage, PrimaryAutoCommandBuffer, RenderPassBeginInfo,
    SubpassContents,
};
use vulkano::descriptor_set::allocator::StandardDescriptorSetAllocator;
use vulkano::descriptor_set::{PersistentDescriptorSet, WriteDescriptorSet};
use vulkano::device::physical::PhysicalDeviceType;
use vulkano::device::{Device, DeviceCreateInfo, DeviceExtensions, Queue, QueueCreateInfo};
use vulkano::format::Format;
use vulkano::image::view::ImageView;
use vulkano::image::{AttachmentImage, ImageAccess, SwapchainImage};
use vulkano::instance::{Instance, InstanceCreateInfo};
use vulkano::memory::allocator::StandardMemoryAllocator;
use vulkano::pipeline::graphics::depth_stencil::DepthStencilState;
use vulkano::pipeline::graphics::input_assembly::{InputAssemblyState, PrimitiveTopology};
use vulkano::pipeline::graphics::rasterization::{CullMode, RasterizationState};
use vulkano::pipeline::graphics::vertex_input::BuffersDefinition;
use vulkano::pipeline::graphics::viewport::{Viewport, ViewportState};
use vulkano::pipeline::{GraphicsPipeline, Pipeline, PipelineBindPoint};
use vulkano::render_pass::{Framebuffer, FramebufferCreateInfo, RenderPass, Subpass};
use vulkano::shader::ShaderModule;
use vulkano::swapchain::{
    self, AcquireError, PresentMode, Surface, Swapchain, SwapchainAcquireFuture,
    SwapchainCreateInfo, SwapchainCreationError, SwapchainPresentInfo,
};
use vulkano::sync::{self, FlushError, GpuFuture};
use vulkano::{Version, VulkanLibrary};

use vulkano_win::VkSurfaceBuild;

use winit::dpi::PhysicalSize;
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder};

use std::mem;
use std::sync::Arc;

pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;
pub const ASPECT_RATIO: f32 = WINDOW_WIDTH as f32 / WINDOW_HEIGHT as f32;

const CLEAR_COLOR: [f32; 4] = [0.2, 0.3, 0.3, 1.0];
const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

vulkano::impl_vertex!(Position, position);
vulkano::impl_vertex!(Color, color);

mod mesh_vert {
    vulkano_shaders::shader! {
        ty: "vertex",
        path: "src/render/shaders/mesh.vert",
        types_meta: {
            use bytemuck::{Pod, Zeroable};

            #[derive(Clone, Copy, Zeroable, Pod)]
        },
    }
}

mod mesh_frag {
    vulkano_shaders::shader! {
        ty: "fragment",
        path: "src/render/shaders/mesh.frag",
    }
}

fn get_window(surface: &Arc<Surface>) -> &Window {
    surface
        .object()
        .and_then(|object| object.downcast_ref::<Window>())
        .expect("surface is always built from a winit window")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderStage {
    Stopped,
    Render,
    NeedsRedraw,
}

/// A pipeline for one primitive topology plus its camera descriptor set.
struct TopologyPipeline {
    pipeline: Arc<GraphicsPipeline>,
    camera_set: Arc<PersistentDescriptorSet>,
}

impl TopologyPipeline {
    fn new(
        device: Arc<Device>,
        subpass: Subpass,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        topology: PrimitiveTopology,
        descriptor_set_allocator: &StandardDescriptorSetAllocator,
        camera_buffer: Arc<CpuAccessibleBuffer<mesh_vert::ty::Camera>>,
    ) -> Result<Self> {
        let vertex_entry = vertex_shader
            .entry_point("main")
            .ok_or_else(|| eyre!("vertex shader has no main entry point"))?;
        let fragment_entry = fragment_shader
            .entry_point("main")
            .ok_or_else(|| eyre!("fragment shader has no main entry point"))?;

        let pipeline = GraphicsPipeline::start()
            .vertex_input_state(
                BuffersDefinition::new()
                    .vertex::<Position>()
                    .vertex::<Color>(),
            )
            .vertex_shader(vertex_entry, ())
            .input_assembly_state(InputAssemblyState::new().topology(topology))
            .viewport_state(ViewportState::viewport_dynamic_scissor_irrelevant())
            .fragment_shader(fragment_entry, ())
            .depth_stencil_state(DepthStencilState::simple_depth_test())
            .rasterization_state(RasterizationState::new().cull_mode(CullMode::None))
            .render_pass(subpass)
            .build(device)?;

        let camera_layout = pipeline
            .layout()
            .set_layouts()
            .get(0)
            .ok_or_else(|| eyre!("pipeline has no descriptor set layout"))?;
        let camera_set = PersistentDescriptorSet::new(
            descriptor_set_allocator,
            camera_layout.clone(),
            [WriteDescriptorSet::buffer(0, camera_buffer)],
        )?;

        Ok(TopologyPipeline {
            pipeline,
            camera_set,
        })
    }
}

pub struct Render {
    pub device: Arc<Device>,

    surface: Arc<Surface>,
    queue: Arc<Queue>,
    swapchain: Arc<Swapchain>,
    memory_allocator: Arc<StandardMemoryAllocator>,
    command_buffer_allocator: StandardCommandBufferAllocator,
    render_pass: Arc<RenderPass>,
    points: TopologyPipeline,
    lines: TopologyPipeline,
    triangles: TopologyPipeline,
    viewport: Viewport,
    framebuffers: Vec<Arc<Framebuffer>>,
    render_stage: RenderStage,
    commands: Option<AutoCommandBufferBuilder<PrimaryAutoCommandBuffer>>,
    image_index: u32,
    acquire_future: Option<SwapchainAcquireFuture>,
}

impl Render {
    /// Opens the window and prepares everything needed to draw a mesh seen
    /// through the fixed camera of `transform`.
    pub fn new(
        event_loop: &EventLoop<()>,
        title: &str,
        transform: &ModelTransform,
    ) -> Result<Render> {
        let instance = {
            let library = VulkanLibrary::new()?;

            let mut extensions = vulkano_win::required_extensions(&library);
            extensions.khr_get_surface_capabilities2 = false;

            let mut layers = vec![];
            if cfg!(debug_assertions) {
                if library
                    .layer_properties()?
                    .any(|l| l.name() == VALIDATION_LAYER)
                {
                    layers.push(VALIDATION_LAYER.to_string());
                } else {
                    tracing::warn!("Vulkan validation layer is not available");
                }
            }

            Instance::new(
                library,
                InstanceCreateInfo {
                    enabled_extensions: extensions,
                    enumerate_portability: true,
                    max_api_version: Some(Version::V1_1),
                    enabled_layers: layers,
                    ..Default::default()
                },
            )?
        };

        let surface = WindowBuilder::new()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .build_vk_surface(event_loop, instance.clone())
            .map_err(|err| eyre!("failed to create window surface: {err:?}"))?;

        let device_extensions = DeviceExtensions {
            khr_swapchain: true,
            ext_full_screen_exclusive: false,
            ..DeviceExtensions::empty()
        };

        let (physical_device, queue_family_index) = instance
            .enumerate_physical_devices()?
            .filter(|p| p.supported_extensions().contains(&device_extensions))
            .filter_map(|p| {
                p.queue_family_properties()
                    .iter()
                    .enumerate()
                    .position(|(i, q)| {
                        q.queue_flags.graphics
                            && p.surface_support(i as u32, &surface).unwrap_or(false)
                    })
                    .map(|i| (p, i as u32))
            })
            .min_by_key(|(p, _)| match p.properties().device_type {
                PhysicalDeviceType::DiscreteGpu => 0,
                PhysicalDeviceType::IntegratedGpu => 1,
                PhysicalDeviceType::VirtualGpu => 2,
                PhysicalDeviceType::Cpu => 3,
                PhysicalDeviceType::Other => 4,
                _ => 5,
            })
            .ok_or_else(|| eyre!("no suitable physical device found"))?;

        tracing::info!(
            device = %physical_device.properties().device_name,
            "using physical device"
        );

        let (device, mut queues) = Device::new(
            physical_device,
            DeviceCreateInfo {
                enabled_extensions: device_extensions,
                queue_create_infos: vec![QueueCreateInfo {
                    queue_family_index,
                    ..Default::default()
                }],
                ..Default::default()
            },
        )?;

        let queue = queues
            .next()
            .ok_or_else(|| eyre!("device returned no queue"))?;

        let (swapchain, images) = {
            let caps = device
                .physical_device()
                .surface_capabilities(&surface, Default::default())?;

            let usage = caps.supported_usage_flags;
            let alpha = caps
                .supported_composite_alpha
                .iter()
                .next()
                .ok_or_else(|| eyre!("surface supports no composite alpha mode"))?;

            let image_format = device
                .physical_device()
                .surface_formats(&surface, Default::default())?
                .first()
                .map(|(format, _)| *format);

            let image_extent: [u32; 2] = get_window(&surface).inner_size().into();

            let present_mode = device
                .physical_device()
                .surface_present_modes(&surface)?
                .find(|&mode| mode == PresentMode::Mailbox)
                .unwrap_or(PresentMode::Fifo);

            Swapchain::new(
                device.clone(),
                surface.clone(),
                SwapchainCreateInfo {
                    min_image_count: caps.min_image_count,
                    image_format,
                    image_extent,
                    present_mode,
                    image_usage: usage,
                    composite_alpha: alpha,
                    ..Default::default()
                },
            )?
        };

        let memory_allocator = Arc::new(StandardMemoryAllocator::new_default(device.clone()));
        let descriptor_set_allocator = StandardDescriptorSetAllocator::new(device.clone());
        let command_buffer_allocator =
            StandardCommandBufferAllocator::new(device.clone(), Default::default());

        let vertex_shader = mesh_vert::load(device.clone())?;
        let fragment_shader = mesh_frag::load(device.clone())?;

        let render_pass = vulkano::ordered_passes_renderpass!(device.clone(),
            attachments: {
                final_color: {
                    load: Clear,
                    store: Store,
                    format: swapchain.image_format(),
                    samples: 1,
                },
                depth: {
                    load: Clear,
                    store: DontCare,
                    format: Format::D16_UNORM,
                    samples: 1,
                }
            },
            passes: [
                {
                    color: [final_color],
                    depth_stencil: {depth},
                    input: []
                }
            ]
        )?;

        let mesh_pass = Subpass::from(render_pass.clone(), 0)
            .ok_or_else(|| eyre!("render pass has no subpass 0"))?;

        // View and projection never change, so the uniform is written once.
        let camera_buffer = CpuAccessibleBuffer::from_data(
            &memory_allocator,
            BufferUsage {
                uniform_buffer: true,
                ..BufferUsage::empty()
            },
            false,
            mesh_vert::ty::Camera {
                view: transform.view_matrix_raw(),
                projection: transform.projection_matrix_raw(),
            },
        )?;

        let pipeline = |topology| {
            TopologyPipeline::new(
                device.clone(),
                mesh_pass.clone(),
                &vertex_shader,
                &fragment_shader,
                topology,
                &descriptor_set_allocator,
                camera_buffer.clone(),
            )
        };
        let points = pipeline(PrimitiveTopology::PointList)?;
        let lines = pipeline(PrimitiveTopology::LineList)?;
        let triangles = pipeline(PrimitiveTopology::TriangleList)?;

        let mut viewport = Viewport {
            origin: [0.0, 0.0],
            dimensions: [0.0, 0.0],
            depth_range: 0.0..1.0,
        };

        let framebuffers = Render::window_size_dependent_setup(
            &memory_allocator,
            &images,
            render_pass.clone(),
            &mut viewport,
        )?;

        Ok(Render {
            surface,
            device,
            queue,
            swapchain,
            memory_allocator,
            command_buffer_allocator,
            render_pass,
            points,
            lines,
            triangles,
            viewport,
            framebuffers,
            render_stage: RenderStage::Stopped,
            commands: None,
            image_index: 0,
            acquire_future: None,
        })
    }

    pub fn window(&self) -> &Window {
        get_window(&self.surface)
    }

    pub fn create_mesh_buffers(
        &self,
        mesh: &Mesh,
        vertex_colors: &[Color],
        flat_color: Color,
    ) -> Result<MeshBuffers> {
        MeshBuffers::new(mesh, vertex_colors, flat_color, &self.memory_allocator)
    }

    pub fn upload_flat_color(&self, buffers: &mut MeshBuffers, flat_color: Color) -> Result<()> {
        buffers.set_flat_color(flat_color, &self.memory_allocator)
    }

    pub fn recreate_swapchain(&mut self) -> Result<()> {
        self.render_stage = RenderStage::NeedsRedraw;
        self.commands = None;

        let image_extent: [u32; 2] = get_window(&self.surface).inner_size().into();
        if image_extent[0] == 0 || image_extent[1] == 0 {
            return Ok(());
        }

        let (new_swapchain, new_images) = match self.swapchain.recreate(SwapchainCreateInfo {
            image_extent,
            ..self.swapchain.create_info()
        }) {
            Ok(r) => r,
            Err(SwapchainCreationError::ImageExtentNotSupported { .. }) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let new_framebuffers = Render::window_size_dependent_setup(
            &self.memory_allocator,
            &new_images,
            self.render_pass.clone(),
            &mut self.viewport,
        )?;

        self.swapchain = new_swapchain;
        self.framebuffers = new_framebuffers;
        self.render_stage = RenderStage::Stopped;
        Ok(())
    }

    fn window_size_dependent_setup(
        allocator: &StandardMemoryAllocator,
        images: &[Arc<SwapchainImage>],
        render_pass: Arc<RenderPass>,
        viewport: &mut Viewport,
    ) -> Result<Vec<Arc<Framebuffer>>> {
        let dimensions = images
            .first()
            .ok_or_else(|| eyre!("swapchain has no images"))?
            .dimensions()
            .width_height();
        viewport.dimensions = [dimensions[0] as f32, dimensions[1] as f32];

        let depth_buffer = ImageView::new_default(AttachmentImage::transient(
            allocator,
            dimensions,
            Format::D16_UNORM,
        )?)?;

        let mut framebuffers = Vec::with_capacity(images.len());
        for image in images {
            let view = ImageView::new_default(image.clone())?;
            framebuffers.push(Framebuffer::new(
                render_pass.clone(),
                FramebufferCreateInfo {
                    attachments: vec![view, depth_buffer.clone()],
                    ..Default::default()
                },
            )?);
        }

        Ok(framebuffers)
    }

    fn check_stage(&mut self, expected: RenderStage) -> Result<bool> {
        if self.render_stage == expected {
            return Ok(true);
        }

        match self.render_stage {
            RenderStage::NeedsRedraw => {
                self.recreate_swapchain()?;
                self.render_stage = RenderStage::Stopped;
                self.commands = None;
                Ok(false)
            }
            _ => {
                self.render_stage = RenderStage::Stopped;
                self.commands = None;
                Ok(false)
            }
        }
    }

    pub fn start(&mut self) -> Result<()> {
        if !self.check_stage(RenderStage::Stopped)? {
            return Ok(());
        }
        self.render_stage = RenderStage::Render;

        let (image_index, suboptimal, acquire_future) =
            match swapchain::acquire_next_image(self.swapchain.clone(), None) {
                Ok(r) => r,
                Err(AcquireError::OutOfDate) => {
                    return self.recreate_swapchain();
                }
                Err(err) => return Err(err.into()),
            };

        if suboptimal {
            return self.recreate_swapchain();
        }

        let clear_values = vec![Some(CLEAR_COLOR.into()), Some(1.0.into())];

        let mut commands = AutoCommandBufferBuilder::primary(
            &self.command_buffer_allocator,
            self.queue.queue_family_index(),
            CommandBufferUsage::OneTimeSubmit,
        )?;

        commands.begin_render_pass(
            RenderPassBeginInfo {
                clear_values,
                ..RenderPassBeginInfo::framebuffer(self.framebuffers[image_index as usize].clone())
            },
            SubpassContents::Inline,
        )?;

        self.commands = Some(commands);
        self.image_index = image_index;
        self.acquire_future = Some(acquire_future);
        Ok(())
    }

    /// Records one draw call per pass. Passes that need an index list are
    /// skipped for meshes without faces.
    pub fn draw(
        &mut self,
        buffers: &MeshBuffers,
        passes: &[DrawPass],
        model: [[f32; 4]; 4],
    ) -> Result<()> {
        if !self.check_stage(RenderStage::Render)? {
            return Ok(());
        }

        let push = mesh_vert::ty::Model { model };
        let commands = self
            .commands
            .as_mut()
            .ok_or_else(|| eyre!("draw recorded outside of a frame"))?;

        for pass in passes {
            let (target, colors, indices) = match pass {
                DrawPass::Points => (&self.points, &buffers.flat_colors, None),
                DrawPass::Edges => match &buffers.edges {
                    Some(edges) => (&self.lines, &buffers.flat_colors, Some(edges)),
                    None => continue,
                },
                DrawPass::Faces => match &buffers.triangles {
                    Some(triangles) => (&self.triangles, &buffers.vertex_colors, Some(triangles)),
                    None => continue,
                },
            };

            commands
                .set_viewport(0, [self.viewport.clone()])
                .bind_pipeline_graphics(target.pipeline.clone())
                .push_constants(target.pipeline.layout().clone(), 0, push)
                .bind_descriptor_sets(
                    PipelineBindPoint::Graphics,
                    target.pipeline.layout().clone(),
                    0,
                    target.camera_set.clone(),
                )
                .bind_vertex_buffers(0, (buffers.positions.clone(), colors.clone()));

            match indices {
                Some(index_buffer) => {
                    commands
                        .bind_index_buffer(index_buffer.clone())
                        .draw_indexed(index_buffer.len() as u32, 1, 0, 0, 0)?;
                }
                None => {
                    commands.draw(buffers.vertex_count(), 1, 0, 0)?;
                }
            }
        }

        Ok(())
    }

    pub fn finish(&mut self, previous_frame_end: &mut Option<Box<dyn GpuFuture>>) -> Result<()> {
        if !self.check_stage(RenderStage::Render)? {
            return Ok(());
        }

        let mut commands = self
            .commands
            .take()
            .ok_or_else(|| eyre!("frame finished without recorded commands"))?;
        commands.end_render_pass()?;
        let command_buffer = commands.build()?;

        let af = self
            .acquire_future
            .take()
            .ok_or_else(|| eyre!("frame finished without an acquired image"))?;

        let mut local_future: Option<Box<dyn GpuFuture>> =
            Some(Box::new(sync::now(self.device.clone())) as Box<dyn GpuFuture>);

        mem::swap(&mut local_future, previous_frame_end);

        let previous = local_future
            .unwrap_or_else(|| Box::new(sync::now(self.device.clone())) as Box<dyn GpuFuture>);

        let future = previous
            .join(af)
            .then_execute(self.queue.clone(), command_buffer)?
            .then_swapchain_present(
                self.queue.clone(),
                SwapchainPresentInfo::swapchain_image_index(
                    self.swapchain.clone(),
                    self.image_index,
                ),
            )
            .then_signal_fence_and_flush();

        match future {
            Ok(future) => {
                *previous_frame_end = Some(Box::new(future) as Box<_>);
            }
            Err(FlushError::OutOfDate) => {
                self.recreate_swapchain()?;
                *previous_frame_end = Some(Box::new(sync::now(self.device.clone())) as Box<_>);
            }
            Err(e) => {
                tracing::error!("Failed to flush future: {:?}", e);
                *previous_frame_end = Some(Box::new(sync::now(self.device.clone())) as Box<_>);
            }
        }

        self.commands = None;
        self.render_stage = RenderStage::Stopped;
        Ok(())
    }
}
