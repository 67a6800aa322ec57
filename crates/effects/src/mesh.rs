use std::path::Path;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

/// Interleaved vertex format for the lens geometry.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub(crate) const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };
}

/// CPU-side copy of the single static lens asset. Loaded (or generated) once
/// at mount and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LensMesh {
    pub(crate) vertices: Vec<MeshVertex>,
    pub(crate) indices: Vec<u32>,
}

impl LensMesh {
    /// Reads the first primitive of the first mesh in a glTF file. Anything
    /// the lens pass cannot use (missing normals, no indices) is a load
    /// error, which is fatal to the lens instance only.
    pub fn from_gltf(path: &Path) -> Result<Self> {
        let (document, buffers, _images) = gltf::import(path)
            .with_context(|| format!("failed to read lens mesh at {}", path.display()))?;
        let mesh = document
            .meshes()
            .next()
            .with_context(|| format!("{} contains no meshes", path.display()))?;
        let primitive = mesh
            .primitives()
            .next()
            .with_context(|| format!("{} contains no mesh primitives", path.display()))?;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .with_context(|| format!("{} primitive has no positions", path.display()))?
            .collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .with_context(|| format!("{} primitive has no normals", path.display()))?
            .collect();
        anyhow::ensure!(
            positions.len() == normals.len(),
            "{} position/normal counts differ ({} vs {})",
            path.display(),
            positions.len(),
            normals.len()
        );
        let indices: Vec<u32> = reader
            .read_indices()
            .with_context(|| format!("{} primitive is not indexed", path.display()))?
            .into_u32()
            .collect();

        let vertices = positions
            .into_iter()
            .zip(normals)
            .map(|(position, normal)| MeshVertex { position, normal })
            .collect();
        let mesh = Self { vertices, indices };
        mesh.check_indices()?;
        Ok(mesh)
    }

    /// Built-in lens profile: a unit-radius cylinder lathed about the y
    /// axis, the same orientation as the bundled source asset. The lens
    /// pass rotates it to face the camera at the model level. Used when no
    /// mesh path is configured.
    pub fn cylinder(radial_segments: u32) -> Self {
        let segments = radial_segments.max(3);
        let half_height = 0.15_f32;

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        // Side wall: two rings with outward normals.
        for ring in 0..2 {
            let y = if ring == 0 { -half_height } else { half_height };
            for step in 0..=segments {
                let theta = step as f32 / segments as f32 * std::f32::consts::TAU;
                let (sin, cos) = theta.sin_cos();
                vertices.push(MeshVertex {
                    position: [cos, y, sin],
                    normal: [cos, 0.0, sin],
                });
            }
        }
        let ring_stride = segments + 1;
        for step in 0..segments {
            let a = step;
            let b = step + 1;
            let c = ring_stride + step;
            let d = ring_stride + step + 1;
            indices.extend([a, c, b, b, c, d]);
        }

        // Caps: fan around a center vertex, normals along ±y.
        for (cap, y, normal_y) in [(0u32, -half_height, -1.0f32), (1, half_height, 1.0)] {
            let center = vertices.len() as u32;
            vertices.push(MeshVertex {
                position: [0.0, y, 0.0],
                normal: [0.0, normal_y, 0.0],
            });
            let rim_start = vertices.len() as u32;
            for step in 0..=segments {
                let theta = step as f32 / segments as f32 * std::f32::consts::TAU;
                let (sin, cos) = theta.sin_cos();
                vertices.push(MeshVertex {
                    position: [cos, y, sin],
                    normal: [0.0, normal_y, 0.0],
                });
            }
            for step in 0..segments {
                let rim_a = rim_start + step;
                let rim_b = rim_start + step + 1;
                if cap == 0 {
                    indices.extend([center, rim_a, rim_b]);
                } else {
                    indices.extend([center, rim_b, rim_a]);
                }
            }
        }

        Self { vertices, indices }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    fn check_indices(&self) -> Result<()> {
        let vertex_count = self.vertices.len() as u32;
        anyhow::ensure!(
            self.indices.iter().all(|index| *index < vertex_count),
            "mesh index out of bounds (vertex count {vertex_count})"
        );
        anyhow::ensure!(
            self.indices.len() % 3 == 0,
            "mesh index count {} is not a triangle list",
            self.indices.len()
        );
        Ok(())
    }

    pub(crate) fn upload(&self, device: &wgpu::Device) -> GpuMesh {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lens mesh vertices"),
            contents: bytemuck::cast_slice(&self.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("lens mesh indices"),
            contents: bytemuck::cast_slice(&self.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// GPU residency of the lens mesh; owned by the RefractionLens.
pub(crate) struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_is_a_valid_triangle_list() {
        let mesh = LensMesh::cylinder(24);
        mesh.check_indices().expect("indices in bounds");
        assert!(mesh.index_count() > 0);
    }

    #[test]
    fn cylinder_clamps_tiny_segment_counts() {
        let mesh = LensMesh::cylinder(1);
        mesh.check_indices().expect("indices in bounds");
        // 3 segments minimum: side (2 rings) + 2 caps.
        assert!(mesh.vertex_count() >= 3 * 2 + 2 * (3 + 2));
    }

    #[test]
    fn cylinder_normals_are_unit_length() {
        let mesh = LensMesh::cylinder(16);
        for vertex in &mesh.vertices {
            let [x, y, z] = vertex.normal;
            let length = (x * x + y * y + z * z).sqrt();
            assert!((length - 1.0).abs() < 1e-5, "normal length {length}");
        }
    }

    #[test]
    fn cylinder_positions_stay_on_unit_radius_or_axis() {
        let mesh = LensMesh::cylinder(16);
        for vertex in &mesh.vertices {
            let [x, _, z] = vertex.position;
            let radial = (x * x + z * z).sqrt();
            assert!(radial < 1.0 + 1e-5, "radial extent {radial}");
        }
    }

    #[test]
    fn missing_gltf_file_is_an_error() {
        let err = LensMesh::from_gltf(Path::new("/nonexistent/lens.glb")).unwrap_err();
        assert!(err.to_string().contains("lens mesh"));
    }
}
