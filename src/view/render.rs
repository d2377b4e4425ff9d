use glam::Vec3;
use wgpu::*;

use crate::controller::FrameLoopContext;
use crate::model::Environment;
use crate::model::{Bunny, Roamer};
use crate::utils::{Mesh, MeshBuffer, StreamingMesh, Vertex};

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
pub const CLEAR_COLOR: Color = Color::BLACK;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    /// Direction the light travels, normalised.
    pub light_dir: [f32; 3],
    pub light_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

impl Default for LightingUniform {
    /// Grey ambient at 0.3 plus a white directional light along (-5, -5, -5).
    fn default() -> Self {
        let dir = Vec3::new(-5.0, -5.0, -5.0).normalize();
        Self {
            light_dir: dir.to_array(),
            light_intensity: 1.0,
            ambient: 0.3,
            _pad1: 0.0,
            _pad2: 0.0,
            _pad3: 0.0,
        }
    }
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

pub struct PipelineResources {
    pub pipeline: wgpu::RenderPipeline,
    pub wireframe_pipeline: Option<wgpu::RenderPipeline>,
}

const VERTEX_ATTRIBUTES: [VertexAttribute; 4] = [
    VertexAttribute { offset: 0, shader_location: 0, format: VertexFormat::Float32x3 },
    VertexAttribute { offset: 12, shader_location: 1, format: VertexFormat::Float32x3 },
    VertexAttribute { offset: 24, shader_location: 2, format: VertexFormat::Float32x4 },
    VertexAttribute { offset: 40, shader_location: 3, format: VertexFormat::Float32x2 },
];

fn vertex_layout() -> VertexBufferLayout<'static> {
    VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as BufferAddress,
        step_mode: VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let uniform_entry = |binding: u32, visibility: ShaderStages| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            uniform_entry(0, ShaderStages::VERTEX),
            uniform_entry(1, ShaderStages::FRAGMENT),
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

fn scene_pipeline(
    device: &wgpu::Device,
    layout: &PipelineLayout,
    shader: &ShaderModule,
    format: TextureFormat,
    polygon_mode: PolygonMode,
) -> RenderPipeline {
    let label = match polygon_mode {
        PolygonMode::Fill => "scene_pipeline",
        _ => "wireframe_pipeline",
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState { format, blend: Some(wgpu::BlendState::REPLACE), write_mask: wgpu::ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

pub fn create_scene_pipelines(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> PipelineResources {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("scene_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/scene.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = scene_pipeline(device, &pipeline_layout, &shader, format, PolygonMode::Fill);
    let wireframe_pipeline = device
        .features()
        .contains(wgpu::Features::POLYGON_MODE_LINE)
        .then(|| scene_pipeline(device, &pipeline_layout, &shader, format, PolygonMode::Line));

    PipelineResources { pipeline, wireframe_pipeline }
}

/// Roamer and every bunny, rebuilt from the model each frame.
/// Bunnies the actor buffer holds before it first has to grow.
pub const INITIAL_BUNNY_SLOTS: usize = 16;

/// Vertex and index counts for the roamer plus `bunnies` bunnies.
pub fn actor_capacity(bunnies: usize) -> (usize, usize) {
    let roamer = Roamer::new(Vec3::ZERO, 1.0).mesh();
    let bunny = Bunny::new(1.0).mesh();
    (
        roamer.vertices.len() + bunny.vertices.len() * bunnies,
        roamer.indices.len() + bunny.indices.len() * bunnies,
    )
}

pub fn actor_mesh(frame: &FrameLoopContext) -> Mesh {
    let mut mesh = frame.roamer.mesh();
    for bunny in &frame.bunnies {
        mesh.append(&bunny.mesh());
    }
    mesh
}

/// egui output ready to paint.
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

///////////////////////////////////////////////////////////////////////////////

/// Consolidated render state to avoid parameter explosion
pub struct RenderState {
    pub width: u32,
    pub height: u32,

    camera: CameraResources,
    pipelines: PipelineResources,
    depth_view: TextureView,

    // Meshes
    environment_mesh: MeshBuffer,
    actor_mesh: StreamingMesh,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub wireframe_mode: bool,
}

impl RenderState {
    pub fn new(device: &Device, queue: &Queue, format: TextureFormat, width: u32, height: u32, environment: &Environment) -> Self {
        let camera = create_camera_resources(device);
        queue.write_buffer(&camera.lighting_buffer, 0, bytemuck::bytes_of(&LightingUniform::default()));
        let pipelines = create_scene_pipelines(device, format, &camera.bind_group_layout);
        let (_, depth_view) = create_depth_texture(device, width, height);
        let env_mesh = environment.mesh();
        tracing::info!(
            vertices = env_mesh.vertices.len(),
            triangles = env_mesh.indices.len() / 3,
            wireframe = pipelines.wireframe_pipeline.is_some(),
            "uploading environment"
        );
        let egui_renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());
        let (actor_vertices, actor_indices) = actor_capacity(INITIAL_BUNNY_SLOTS);
        Self {
            width,
            height,
            camera,
            pipelines,
            depth_view,
            environment_mesh: env_mesh.upload(device),
            actor_mesh: StreamingMesh::with_capacity(device, actor_vertices, actor_indices),
            egui_renderer,
            wireframe_mode: false,
        }
    }

    pub fn has_wireframe(&self) -> bool {
        self.pipelines.wireframe_pipeline.is_some()
    }

    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        let (_, depth_view) = create_depth_texture(device, width, height);
        self.depth_view = depth_view;
    }

    /// Push camera and actor state for the coming frame.
    pub fn update_scene(&mut self, device: &Device, queue: &Queue, frame: &FrameLoopContext) {
        let uniform = CameraUniform { view_proj: frame.camera.view_proj().to_cols_array_2d() };
        queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&uniform));
        self.actor_mesh.write(device, queue, &actor_mesh(frame));
    }

    pub fn draw_frame(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
        ui: Option<UiFrame>,
    ) -> Result<(), SurfaceError> {
        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(CLEAR_COLOR),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let active_pipeline = match (&self.pipelines.wireframe_pipeline, self.wireframe_mode) {
                (Some(wire), true) => wire,
                _ => &self.pipelines.pipeline,
            };
            rp.set_pipeline(active_pipeline);
            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            for mesh in [&self.environment_mesh, self.actor_mesh.buffer()] {
                if mesh.index_count == 0 {
                    continue;
                }
                rp.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                rp.set_index_buffer(mesh.index_buffer.slice(..), IndexFormat::Uint32);
                rp.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        if let Some(ui) = ui {
            self.paint_ui(device, queue, &mut encoder, &view, ui);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn paint_ui(&mut self, device: &Device, queue: &Queue, encoder: &mut CommandEncoder, view: &TextureView, ui: UiFrame) {
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: ui.pixels_per_point,
        };

        for (id, image_delta) in &ui.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }
        self.egui_renderer
            .update_buffers(device, queue, encoder, &ui.primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &ui.primitives, &screen_descriptor);
        }

        for id in &ui.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_match_shader_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
        assert_eq!(std::mem::size_of::<LightingUniform>(), 32);
        assert_eq!(std::mem::size_of::<Vertex>(), 48);
    }

    #[test]
    fn actor_capacity_covers_roamer_and_bunnies() {
        use crate::config::RoamConfig;
        use crate::model::{Environment, Heightmap};
        let env = Environment::from_parts(Heightmap::flat(5, 4.0, 0.0), Vec::new());
        let mut frame = FrameLoopContext::with_environment(&RoamConfig::default(), env, 640, 480);
        frame.bunnies = vec![Bunny::new(0.3); INITIAL_BUNNY_SLOTS];
        let mesh = actor_mesh(&frame);
        let (vertices, indices) = actor_capacity(INITIAL_BUNNY_SLOTS);
        assert_eq!(mesh.vertices.len(), vertices);
        assert_eq!(mesh.indices.len(), indices);
    }

    #[test]
    fn default_light_points_down_the_diagonal() {
        let l = LightingUniform::default();
        let d = Vec3::from_array(l.light_dir);
        assert!((d.length() - 1.0).abs() < 1e-5);
        assert!(d.x < 0.0 && d.y < 0.0 && d.z < 0.0);
        assert_eq!(l.ambient, 0.3);
    }
}
