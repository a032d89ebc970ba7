use anyhow::{Context as AnyhowContext, Result};
use glam::Mat4;
use tracing::debug;

use crate::instances::{BatchId, InstanceBatches, InstanceRaw};

/// Device and queue without a presentation surface.
pub struct GpuContext {
    pub _instance: wgpu::Instance,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl GpuContext {
    pub fn headless() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("evergreen device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .context("failed to create GPU device")?;

        Ok(Self {
            _instance: instance,
            device,
            queue,
            adapter_name: info.name,
        })
    }
}

/// One vertex buffer per instance batch plus the group transform uniform.
pub struct GpuInstances {
    buffers: Vec<(BatchId, Option<wgpu::Buffer>)>,
    group: wgpu::Buffer,
    uploads: u64,
}

impl GpuInstances {
    /// Allocates buffers sized for each batch. Empty batches get none.
    pub fn new(device: &wgpu::Device, batches: &InstanceBatches) -> Self {
        let buffers = batches
            .iter()
            .map(|(id, batch)| {
                let buffer = (!batch.is_empty()).then(|| {
                    device.create_buffer(&wgpu::BufferDescriptor {
                        label: Some(id.label()),
                        size: (batch.len() * std::mem::size_of::<InstanceRaw>()) as u64,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                        mapped_at_creation: false,
                    })
                });
                (id, buffer)
            })
            .collect();
        let group = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("group transform"),
            size: std::mem::size_of::<[f32; 16]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self {
            buffers,
            group,
            uploads: 0,
        }
    }

    pub fn group_buffer(&self) -> &wgpu::Buffer {
        &self.group
    }

    pub fn buffer(&self, id: BatchId) -> Option<&wgpu::Buffer> {
        self.buffers
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .and_then(|(_, buffer)| buffer.as_ref())
    }

    /// Total batch uploads since creation.
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Writes the group transform, then every dirty batch that has a buffer,
    /// marking each clean. Returns the number of batches written.
    pub fn upload(
        &mut self,
        queue: &wgpu::Queue,
        batches: &mut InstanceBatches,
        group: Mat4,
    ) -> usize {
        queue.write_buffer(&self.group, 0, bytemuck::cast_slice(&group.to_cols_array()));

        let mut written = 0;
        for (id, batch) in batches.iter_mut() {
            if !batch.is_dirty() {
                continue;
            }
            let Some(buffer) = self.buffer(id) else {
                continue;
            };
            let bytes: &[u8] = bytemuck::cast_slice(batch.instances());
            if bytes.len() as u64 > buffer.size() {
                continue;
            }
            queue.write_buffer(buffer, 0, bytes);
            batch.mark_clean();
            written += 1;
        }
        self.uploads += written as u64;
        written
    }
}
