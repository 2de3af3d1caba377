//! Asynchronous compute backend: one kernel dispatch per tile, completion
//! observed through the queue's submitted-work callbacks.

use std::collections::HashMap;

use futures_channel::oneshot;
use quadzoom_compute::{Completions, ComputeBackend, ComputeError, DispatchStatus, TileId};
use quadzoom_core::Bounds;
use wgpu::util::DeviceExt;

use crate::buffers::{padded_bytes_per_row, unpad_rows, KernelBounds};
use crate::device::GpuContext;
use crate::error::GpuError;
use crate::pipeline::{EscapePipeline, TILE_FORMAT, WORKGROUP_SIZE};

/// Device-resident tile image. The texture is destroyed on drop.
pub struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    resolution: u32,
}

impl GpuImage {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// View for sampling the image when drawing the tile.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        self.texture.destroy();
    }
}

/// Resources of one in-flight dispatch.
struct PendingRender {
    done: oneshot::Receiver<()>,
    _bounds: wgpu::Buffer,
    _bind_group: wgpu::BindGroup,
}

/// Renders tiles with the escape-time kernel on the GPU.
pub struct GpuComputeBackend {
    context: GpuContext,
    pipeline: EscapePipeline,
    resolution: u32,
    pending: HashMap<TileId, PendingRender>,
}

impl GpuComputeBackend {
    /// Build the kernel and check that the device can hold tile images of
    /// `resolution` squared texels.
    pub fn new(context: GpuContext, resolution: u32) -> Result<Self, GpuError> {
        assert!(resolution > 0, "texture resolution must be > 0");
        let max = context.max_texture_resolution();
        if resolution > max {
            return Err(GpuError::Unavailable(format!(
                "texture resolution {resolution} exceeds device limit {max}"
            )));
        }
        let pipeline = EscapePipeline::new(&context.device)?;
        Ok(Self {
            context,
            pipeline,
            resolution,
            pending: HashMap::new(),
        })
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Block until all submitted work has finished. The next
    /// [`ComputeBackend::poll_completed`] then reports every pending tile.
    pub fn wait_idle(&self) {
        self.context.device.poll(wgpu::Maintain::Wait);
    }

    /// Copy an image back to the host as row-major escape values.
    pub async fn read_image(&self, image: &GpuImage) -> Result<Vec<f32>, GpuError> {
        let res = image.resolution;
        let bytes_per_row = padded_bytes_per_row(res);
        let staging = self.context.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tile_readback"),
            size: bytes_per_row as u64 * res as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("tile_readback_encoder"),
                });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &image.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(res),
                },
            },
            square_extent(res),
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        self.context.device.poll(wgpu::Maintain::Wait);
        rx.await
            .map_err(|_| GpuError::Unavailable("Read-back channel closed".into()))??;

        let pixels = {
            let data = slice.get_mapped_range();
            unpad_rows(&data, res, res)
        };
        staging.unmap();
        Ok(pixels)
    }
}

fn square_extent(resolution: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: resolution,
        height: resolution,
        depth_or_array_layers: 1,
    }
}

impl ComputeBackend for GpuComputeBackend {
    type Image = GpuImage;

    fn name(&self) -> &'static str {
        "gpu"
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }

    fn create_image(&mut self) -> Result<GpuImage, ComputeError> {
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        // New textures are zero-initialized
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tile_image"),
            size: square_extent(self.resolution),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TILE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            texture.destroy();
            return Err(GpuError::Allocation(err.to_string()).into());
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(GpuImage {
            texture,
            view,
            resolution: self.resolution,
        })
    }

    fn dispatch(
        &mut self,
        tile: TileId,
        bounds: &Bounds,
        image: &mut GpuImage,
    ) -> Result<DispatchStatus, ComputeError> {
        assert!(
            !self.pending.contains_key(&tile),
            "tile {tile} dispatched while a render is in flight"
        );
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let bounds_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile_bounds"),
            contents: bytemuck::bytes_of(&KernelBounds::from(bounds)),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("escape_time_bind_group"),
            layout: &self.pipeline.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: bounds_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&image.view),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("escape_time_encoder"),
        });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("escape_time_pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(&self.pipeline.compute_pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            let groups = image.resolution.div_ceil(WORKGROUP_SIZE);
            compute_pass.dispatch_workgroups(groups, groups, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ComputeError::Dispatch {
                tile,
                reason: err.to_string(),
            });
        }

        // Fires once everything submitted so far, this dispatch included, is done
        let (tx, rx) = oneshot::channel();
        self.context.queue.on_submitted_work_done(move || {
            let _ = tx.send(());
        });

        self.pending.insert(
            tile,
            PendingRender {
                done: rx,
                _bounds: bounds_buffer,
                _bind_group: bind_group,
            },
        );
        log::debug!("gpu: dispatched tile {tile}, {} in flight", self.pending.len());
        Ok(DispatchStatus::Pending)
    }

    fn poll_completed(&mut self) -> Completions {
        let mut out = Completions::default();
        if self.pending.is_empty() {
            return out;
        }

        self.context.device.poll(wgpu::Maintain::Poll);

        self.pending
            .retain(|&tile, render| match render.done.try_recv() {
                Ok(Some(())) => {
                    out.completed.push(tile);
                    false
                }
                Ok(None) => true,
                Err(oneshot::Canceled) => {
                    out.failed.push((
                        tile,
                        ComputeError::Sync {
                            tile,
                            reason: "device dropped the completion callback".into(),
                        },
                    ));
                    false
                }
            });
        out.completed.sort();
        out
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
