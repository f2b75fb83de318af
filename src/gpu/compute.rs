//! Agent storage buffers and the two compute passes.
//!
//! Needs only a device. [`GpuState`](super::GpuState) wraps this with a
//! surface and the bird mesh; headless callers drive it directly and read
//! the agents back.

use wgpu::util::DeviceExt;

use crate::config::FlockConfig;
use crate::error::GpuError;
use crate::shader::{self, WORKGROUP_SIZE};
use crate::store::AgentStore;
use crate::uniforms::SimUniforms;

use super::{storage_entry, uniform_entry};

pub struct FlockCompute {
    sim_uniform_buffer: wgpu::Buffer,
    position_buffer: wgpu::Buffer,
    velocity_buffer: wgpu::Buffer,
    velocity_next_buffer: wgpu::Buffer,
    phase_buffer: wgpu::Buffer,
    velocity_pipeline: wgpu::ComputePipeline,
    position_pipeline: wgpu::ComputePipeline,
    velocity_bind_group: wgpu::BindGroup,
    position_bind_group: wgpu::BindGroup,
    agent_count: u32,
}

impl FlockCompute {
    pub fn new(device: &wgpu::Device, flock: &FlockConfig, store: &AgentStore) -> Self {
        let agent_count = store.len() as u32;
        let state_usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;

        let position_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Position Buffer"),
            contents: store.position_bytes(),
            usage: state_usage,
        });
        let velocity_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Velocity Buffer"),
            contents: store.velocity_bytes(),
            usage: state_usage,
        });
        let velocity_next_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Velocity Next Buffer"),
            size: store.velocity_bytes().len() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let phase_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Phase Buffer"),
            contents: store.phase_bytes(),
            usage: state_usage,
        });

        let sim_uniforms = SimUniforms::from_config(flock);
        let sim_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Sim Uniform Buffer"),
            contents: bytemuck::bytes_of(&sim_uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        // Velocity pass: uniforms, positions, velocities, velocity_next
        let velocity_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Velocity Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, true, wgpu::ShaderStages::COMPUTE),
                storage_entry(2, true, wgpu::ShaderStages::COMPUTE),
                storage_entry(3, false, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let velocity_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Velocity Bind Group"),
            layout: &velocity_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: sim_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: position_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: velocity_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: velocity_next_buffer.as_entire_binding(),
                },
            ],
        });

        // Position pass: uniforms, positions, velocities, phases
        let position_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Position Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                storage_entry(1, false, wgpu::ShaderStages::COMPUTE),
                storage_entry(2, true, wgpu::ShaderStages::COMPUTE),
                storage_entry(3, false, wgpu::ShaderStages::COMPUTE),
            ],
        });
        let position_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Position Bind Group"),
            layout: &position_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: sim_uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: position_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: velocity_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: phase_buffer.as_entire_binding(),
                },
            ],
        });

        let velocity_pipeline = create_compute_pipeline(
            device,
            "Velocity",
            &shader::velocity_shader(),
            &velocity_layout,
        );
        let position_pipeline = create_compute_pipeline(
            device,
            "Position",
            &shader::position_shader(),
            &position_layout,
        );

        Self {
            sim_uniform_buffer,
            position_buffer,
            velocity_buffer,
            velocity_next_buffer,
            phase_buffer,
            velocity_pipeline,
            position_pipeline,
            velocity_bind_group,
            position_bind_group,
            agent_count,
        }
    }

    #[inline]
    pub fn agent_count(&self) -> u32 {
        self.agent_count
    }

    pub fn upload(&self, queue: &wgpu::Queue, sim: &SimUniforms) {
        queue.write_buffer(&self.sim_uniform_buffer, 0, bytemuck::bytes_of(sim));
    }

    /// Velocity pass into `velocity_next`, then the copy back over
    /// `velocity`. The position pass recorded after it sees the new values.
    pub fn record_velocity(&self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Velocity Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.velocity_pipeline);
            pass.set_bind_group(0, &self.velocity_bind_group, &[]);
            pass.dispatch_workgroups(self.workgroups(), 1, 1);
        }
        encoder.copy_buffer_to_buffer(
            &self.velocity_next_buffer,
            0,
            &self.velocity_buffer,
            0,
            self.velocity_buffer.size(),
        );
    }

    pub fn record_position(&self, encoder: &mut wgpu::CommandEncoder) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Position Pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.position_pipeline);
        pass.set_bind_group(0, &self.position_bind_group, &[]);
        pass.dispatch_workgroups(self.workgroups(), 1, 1);
    }

    pub fn position_buffer(&self) -> &wgpu::Buffer {
        &self.position_buffer
    }

    pub fn velocity_buffer(&self) -> &wgpu::Buffer {
        &self.velocity_buffer
    }

    pub fn phase_buffer(&self) -> &wgpu::Buffer {
        &self.phase_buffer
    }

    /// Copy all agent state back to the CPU. Blocks until the GPU is done.
    pub fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<AgentStore, GpuError> {
        let positions = read_buffer(device, queue, &self.position_buffer)?;
        let velocities = read_buffer(device, queue, &self.velocity_buffer)?;
        let phases = read_buffer(device, queue, &self.phase_buffer)?;

        let n = self.agent_count as usize;
        let position = bytemuck::cast_slice::<f32, glam::Vec3>(&positions[..n * 3]).to_vec();
        let velocity = bytemuck::cast_slice::<f32, glam::Vec3>(&velocities[..n * 3]).to_vec();
        AgentStore::from_parts(position, velocity, phases[..n].to_vec()).ok_or(GpuError::Readback)
    }

    fn workgroups(&self) -> u32 {
        self.agent_count.div_ceil(WORKGROUP_SIZE)
    }
}

/// Read a storage buffer of `f32`s through a staging copy.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
) -> Result<Vec<f32>, GpuError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size: buffer.size(),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Readback Encoder"),
    });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, buffer.size());
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    match rx.recv() {
        Ok(Ok(())) => {}
        _ => return Err(GpuError::Readback),
    }

    let data = bytemuck::cast_slice::<u8, f32>(&slice.get_mapped_range()).to_vec();
    staging.unmap();
    Ok(data)
}

fn create_compute_pipeline(
    device: &wgpu::Device,
    name: &str,
    source: &str,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{} Shader", name)),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Pipeline Layout", name)),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{} Pipeline", name)),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}
