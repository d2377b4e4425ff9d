use bytemuck::NoUninit;
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Append another mesh, rebasing its indices.
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Transform positions and normals in place.
    pub fn transform(&mut self, model: &Mat4) {
        let normal_mat = model.inverse().transpose();
        for v in self.vertices.iter_mut() {
            v.pos = model.transform_point3(Vec3::from_array(v.pos)).to_array();
            v.normal = normal_mat
                .transform_vector3(Vec3::from_array(v.normal))
                .normalize_or_zero()
                .to_array();
        }
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Capacity after making room for `needed` elements. Doubles at least, so a
/// run of single spawns reallocates rarely.
pub fn grown_capacity(capacity: usize, needed: usize) -> usize {
    if needed <= capacity {
        return capacity;
    }
    needed.next_power_of_two().max(capacity * 2)
}

/// GPU mesh rewritten in place each frame; reallocated only when a mesh
/// outgrows it.
pub struct StreamingMesh {
    buffer: MeshBuffer,
    vertex_capacity: usize,
    index_capacity: usize,
}

impl StreamingMesh {
    pub fn with_capacity(device: &wgpu::Device, vertices: usize, indices: usize) -> Self {
        let vertices = vertices.max(1);
        let indices = indices.max(1);
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Streaming Vertex Buffer"),
            size: (vertices * std::mem::size_of::<Vertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Streaming Index Buffer"),
            size: (indices * std::mem::size_of::<u32>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffer: MeshBuffer {
                vertex_buffer,
                index_buffer,
                index_count: 0,
            },
            vertex_capacity: vertices,
            index_capacity: indices,
        }
    }

    pub fn write(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, mesh: &Mesh) {
        let vertices = grown_capacity(self.vertex_capacity, mesh.vertices.len());
        let indices = grown_capacity(self.index_capacity, mesh.indices.len());
        if (vertices, indices) != (self.vertex_capacity, self.index_capacity) {
            tracing::debug!(vertices, indices, "growing streaming mesh");
            *self = Self::with_capacity(device, vertices, indices);
        }
        queue.write_buffer(&self.buffer.vertex_buffer, 0, bytemuck::cast_slice(&mesh.vertices));
        queue.write_buffer(&self.buffer.index_buffer, 0, bytemuck::cast_slice(&mesh.indices));
        self.buffer.index_count = mesh.indices.len() as u32;
    }

    pub fn buffer(&self) -> &MeshBuffer {
        &self.buffer
    }
}

/// Axis-aligned box spanning `min..max`, one flat-shaded quad per face.
pub fn create_box_mesh(min: Vec3, max: Vec3, color: [f32; 4]) -> Mesh {
    let faces: [([f32; 3], [Vec3; 4]); 6] = [
        // +X
        ([1.0, 0.0, 0.0], [
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(max.x, max.y, max.z),
        ]),
        // -X
        ([-1.0, 0.0, 0.0], [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(min.x, max.y, min.z),
        ]),
        // +Y
        ([0.0, 1.0, 0.0], [
            Vec3::new(min.x, max.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
        ]),
        // -Y
        ([0.0, -1.0, 0.0], [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(min.x, min.y, max.z),
        ]),
        // +Z
        ([0.0, 0.0, 1.0], [
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ]),
        // -Z
        ([0.0, 0.0, -1.0], [
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(max.x, max.y, min.z),
        ]),
    ];
    let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

    let mut mesh = Mesh::empty();
    for (normal, corners) in faces {
        let base = mesh.vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs) {
            mesh.vertices.push(Vertex {
                pos: corner.to_array(),
                normal,
                color,
                uv,
            });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_has_six_quads() {
        let mesh = create_box_mesh(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn append_rebases_indices() {
        let a = create_box_mesh(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        let mut m = a.clone();
        m.append(&a);
        assert_eq!(m.indices[36], 24);
        assert_eq!(*m.indices.iter().max().unwrap(), 47);
    }

    #[test]
    fn capacity_grows_only_on_overflow() {
        assert_eq!(grown_capacity(64, 10), 64);
        assert_eq!(grown_capacity(64, 64), 64);
        assert_eq!(grown_capacity(64, 65), 128);
        assert_eq!(grown_capacity(64, 300), 512);
        assert_eq!(grown_capacity(1, 24), 32);
    }

    #[test]
    fn transform_moves_positions() {
        let mut m = create_box_mesh(Vec3::ZERO, Vec3::ONE, [1.0; 4]);
        m.transform(&Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0)));
        assert!(m.vertices.iter().all(|v| v.pos[1] >= 5.0));
    }
}
