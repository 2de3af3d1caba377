//! Compute pipeline for the escape-time kernel.

use crate::error::GpuError;

/// WGSL source of the escape-time kernel.
pub const ESCAPE_TIME_WGSL: &str = include_str!("shaders/escape_time.wgsl");

/// Texels per workgroup along each axis; matches `@workgroup_size` in the kernel.
pub const WORKGROUP_SIZE: u32 = 8;

/// Format of every tile image.
pub const TILE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// Compiled escape-time kernel and its bind group layout.
pub struct EscapePipeline {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub compute_pipeline: wgpu::ComputePipeline,
}

impl EscapePipeline {
    /// Compile the kernel. Shader or pipeline validation failures come back as
    /// [`GpuError::KernelBuild`] carrying the compiler diagnostics.
    pub fn new(device: &wgpu::Device) -> Result<Self, GpuError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("escape_time_shader"),
            source: wgpu::ShaderSource::Wgsl(ESCAPE_TIME_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("escape_time_bind_group_layout"),
            entries: &[
                // bounds: [left, right, top, bottom, max_iterations]
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // output tile image
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::StorageTexture {
                        access: wgpu::StorageTextureAccess::WriteOnly,
                        format: TILE_FORMAT,
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("escape_time_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let compute_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("escape_time_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some("main"),
            compilation_options: Default::default(),
            cache: None,
        });

        // Native backends resolve error scopes as soon as they are popped
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("escape-time kernel failed to build: {err}");
            return Err(GpuError::KernelBuild(err.to_string()));
        }

        log::info!("escape-time kernel built");
        Ok(Self {
            bind_group_layout,
            compute_pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_source_parses_and_validates() {
        let module = naga::front::wgsl::parse_str(ESCAPE_TIME_WGSL).expect("WGSL parses");
        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::empty(),
        );
        validator.validate(&module).expect("module validates");

        let entry = module
            .entry_points
            .iter()
            .find(|ep| ep.name == "main")
            .expect("main entry point");
        assert_eq!(entry.stage, naga::ShaderStage::Compute);
        assert_eq!(entry.workgroup_size, [WORKGROUP_SIZE, WORKGROUP_SIZE, 1]);
    }
}
