//! GPU transition kernel
//!
//! Runs `life.wgsl` as a compute shader over ping-pong storage buffers. The CPU
//! side stays authoritative: each step uploads `current` (which may carry
//! fresh drawing or seeding), dispatches one generation and reads the result
//! back into `next`.

use std::sync::Arc;

use log::{debug, info};
use wgpu::{BindGroup, BindGroupLayout, ComputePipeline, Device, Queue};

use super::kernel::{check_step_inputs, TransitionKernel};
use crate::{
    error::{LifeError, LifeResult},
    grid::GridBuffer,
    wgpu_utils::{self, ArrayBuffer, UniformBuffer},
};

const WORKGROUP_SIZE: (u32, u32) = (8, 8);

/// Uniform block shared with `life.wgsl`
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub size: [u32; 2],
    pub reciprocal: [f32; 2],
}

/// Per-resolution buffers, rebuilt whenever the grid size changes
struct GridResources {
    width: u32,
    height: u32,
    buffer_a: ArrayBuffer<f32>,
    buffer_b: ArrayBuffer<f32>,
    staging: ArrayBuffer<f32>,
    bind_group_a_to_b: BindGroup,
    bind_group_b_to_a: BindGroup,
    // false = A holds the input generation
    ping_pong_state: bool,
}

/// Compute-shader implementation of [`TransitionKernel`]
pub struct GpuKernel {
    device: Arc<Device>,
    queue: Arc<Queue>,
    pipeline: ComputePipeline,
    bind_group_layout: BindGroupLayout,
    params: UniformBuffer<KernelParams>,
    resources: Option<GridResources>,
}

impl GpuKernel {
    /// Compile the kernel. Shader or pipeline validation errors are reported
    /// as [`LifeError::Initialization`].
    pub fn new(device: Arc<Device>, queue: Arc<Queue>) -> LifeResult<Self> {
        push_error_scopes(&device);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Life Kernel Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("life.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Life Kernel Bind Group Layout"),
            entries: &[
                wgpu_utils::entry(
                    0,
                    wgpu::ShaderStages::COMPUTE,
                    wgpu_utils::storage_buffer_read_only(),
                ),
                wgpu_utils::entry(
                    1,
                    wgpu::ShaderStages::COMPUTE,
                    wgpu_utils::storage_buffer_read_write(),
                ),
                wgpu_utils::entry(2, wgpu::ShaderStages::COMPUTE, wgpu_utils::uniform()),
            ],
        });

        let pipeline = create_compute_pipeline(&device, &shader, "main", &bind_group_layout);
        let params = UniformBuffer::new(&device);

        if let Some(error) = pop_error_scopes(&device) {
            return Err(LifeError::Initialization(format!(
                "life kernel failed to build: {error}"
            )));
        }

        info!("GPU transition kernel compiled");

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            params,
            resources: None,
        })
    }

    /// Allocate buffers for a `width` x `height` grid unless they already
    /// exist. Allocation failures are [`LifeError::Initialization`] and leave
    /// the kernel without buffers.
    fn ensure_resources(&mut self, width: u32, height: u32) -> LifeResult<()> {
        if let Some(resources) = &self.resources {
            if resources.width == width && resources.height == height {
                return Ok(());
            }
        }

        // Release the old resolution before allocating the new one
        self.resources = None;
        push_error_scopes(&self.device);

        let cell_count = width as usize * height as usize;
        let buffer_a = ArrayBuffer::new_storage(&self.device, cell_count, "Life Buffer A");
        let buffer_b = ArrayBuffer::new_storage(&self.device, cell_count, "Life Buffer B");
        let staging = ArrayBuffer::new_staging(&self.device, cell_count);

        let bind_group_a_to_b = self.create_bind_group("Life Bind Group A->B", &buffer_a, &buffer_b);
        let bind_group_b_to_a = self.create_bind_group("Life Bind Group B->A", &buffer_b, &buffer_a);

        if let Some(error) = pop_error_scopes(&self.device) {
            return Err(LifeError::Initialization(format!(
                "failed to allocate GPU buffers for {width}x{height}: {error}"
            )));
        }
        debug!("Allocated GPU grid buffers for {}x{}", width, height);

        self.resources = Some(GridResources {
            width,
            height,
            buffer_a,
            buffer_b,
            staging,
            bind_group_a_to_b,
            bind_group_b_to_a,
            ping_pong_state: false,
        });
        Ok(())
    }

    fn create_bind_group(
        &self,
        label: &str,
        input: &ArrayBuffer<f32>,
        output: &ArrayBuffer<f32>,
    ) -> BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: input.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: output.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params.binding_resource(),
                },
            ],
        })
    }
}

impl TransitionKernel for GpuKernel {
    fn name(&self) -> &str {
        "GPU"
    }

    fn step(
        &mut self,
        current: &GridBuffer,
        reciprocal: [f32; 2],
        next: &mut GridBuffer,
    ) -> LifeResult<()> {
        check_step_inputs(current, reciprocal, next)?;

        let (width, height) = (current.width(), current.height());
        self.ensure_resources(width, height)?;
        self.params.update_content(
            &self.queue,
            KernelParams {
                size: [width, height],
                reciprocal,
            },
        );

        let resources = self
            .resources
            .as_mut()
            .ok_or_else(|| LifeError::Step("GPU grid buffers missing".into()))?;

        let (input, output, bind_group) = if resources.ping_pong_state {
            (
                &resources.buffer_b,
                &resources.buffer_a,
                &resources.bind_group_b_to_a,
            )
        } else {
            (
                &resources.buffer_a,
                &resources.buffer_b,
                &resources.bind_group_a_to_b,
            )
        };

        push_error_scopes(&self.device);

        if let Err(e) = input.write(&self.queue, current.cells()) {
            pop_error_scopes(&self.device);
            return Err(e);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Life Compute Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Life Compute Pass"),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(&self.pipeline);
            compute_pass.set_bind_group(0, bind_group, &[]);

            let (groups_x, groups_y) = dispatch_size(width, height);
            compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        encoder.copy_buffer_to_buffer(
            output.buffer(),
            0,
            resources.staging.buffer(),
            0,
            output.size(),
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        if let Some(error) = pop_error_scopes(&self.device) {
            return Err(LifeError::Step(format!("life kernel dispatch failed: {error}")));
        }

        read_back(&self.device, &resources.staging, next.cells_mut())?;
        resources.ping_pong_state = !resources.ping_pong_state;

        Ok(())
    }
}

/// Capture allocation and validation errors instead of letting them reach the
/// device's uncaptured error handler, which panics
fn push_error_scopes(device: &Device) {
    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);
}

/// Pop both scopes pushed by [`push_error_scopes`]; the first error wins
fn pop_error_scopes(device: &Device) -> Option<wgpu::Error> {
    let validation = futures::executor::block_on(device.pop_error_scope());
    let out_of_memory = futures::executor::block_on(device.pop_error_scope());
    validation.or(out_of_memory)
}

/// Helper to create a compute pipeline from a compiled module
fn create_compute_pipeline(
    device: &Device,
    shader: &wgpu::ShaderModule,
    entry_point: &str,
    bind_group_layout: &BindGroupLayout,
) -> ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Life Kernel Pipeline Layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("Life Kernel Pipeline"),
        layout: Some(&pipeline_layout),
        module: shader,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}

/// Workgroup counts covering a `width` x `height` grid
pub fn dispatch_size(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(WORKGROUP_SIZE.0),
        height.div_ceil(WORKGROUP_SIZE.1),
    )
}

fn read_back(device: &Device, staging: &ArrayBuffer<f32>, out: &mut [f32]) -> LifeResult<()> {
    let slice = staging.buffer().slice(..);
    let (tx, rx) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device
        .poll(wgpu::PollType::Wait)
        .map_err(|e| LifeError::Step(format!("device poll failed: {e}")))?;

    match futures::executor::block_on(rx) {
        Ok(Ok(())) => {
            {
                let mapped = slice.get_mapped_range();
                out.copy_from_slice(bytemuck::cast_slice(&mapped));
            }
            staging.buffer().unmap();
            Ok(())
        }
        Ok(Err(e)) => Err(LifeError::Step(format!("staging buffer map failed: {e}"))),
        Err(_) => Err(LifeError::Step("staging buffer map was cancelled".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::GridState, simulation::kernel::CpuKernel};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn test_device() -> Option<(Arc<Device>, Arc<Queue>)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await
                .ok()?;
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await
                .ok()?;
            Some((Arc::new(device), Arc::new(queue)))
        })
    }

    #[test]
    fn test_dispatch_size_rounds_up() {
        assert_eq!(dispatch_size(8, 8), (1, 1));
        assert_eq!(dispatch_size(9, 17), (2, 3));
        assert_eq!(dispatch_size(1, 1), (1, 1));
    }

    #[test]
    fn test_gpu_matches_cpu() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let mut gpu = GpuKernel::new(device, queue).expect("kernel should compile");
        let mut cpu = CpuKernel::new();

        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = GridState::new(37, 23).unwrap();
        for y in 0..23 {
            for x in 0..37 {
                grid.write_cell(x, y, rng.random_bool(0.35));
            }
        }

        let mut expected = grid.read().clone();
        for _ in 0..6 {
            let mut cpu_next = GridBuffer::new(37, 23).unwrap();
            cpu.step(&expected, expected.reciprocal(), &mut cpu_next)
                .unwrap();
            expected = cpu_next;

            let reciprocal = grid.read().reciprocal();
            grid.advance(|current, next| gpu.step(current, reciprocal, next))
                .unwrap();

            assert_eq!(grid.read(), &expected);
        }
    }

    #[test]
    fn test_oversized_grid_is_an_initialization_error() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let mut gpu = GpuKernel::new(device.clone(), queue).unwrap();
        let side = 20_000;
        assert!(side as u64 * side as u64 * 4 > device.limits().max_buffer_size);

        assert!(matches!(
            gpu.ensure_resources(side, side),
            Err(LifeError::Initialization(_))
        ));
        assert!(gpu.resources.is_none());

        // The kernel stays usable at a size the device can hold
        let mut grid = GridState::new(8, 8).unwrap();
        grid.write_cell(1, 0, true);
        grid.write_cell(1, 1, true);
        grid.write_cell(1, 2, true);
        let reciprocal = grid.read().reciprocal();
        grid.advance(|current, next| gpu.step(current, reciprocal, next))
            .unwrap();
        assert_eq!(grid.read().alive_cells(), vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn test_gpu_resizes_between_steps() {
        let Some((device, queue)) = test_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let mut gpu = GpuKernel::new(device, queue).unwrap();
        for (w, h) in [(8, 8), (13, 5)] {
            let mut grid = GridState::new(w, h).unwrap();
            grid.write_cell(2, 1, true);
            grid.write_cell(2, 2, true);
            grid.write_cell(2, 3, true);

            let reciprocal = grid.read().reciprocal();
            grid.advance(|current, next| gpu.step(current, reciprocal, next))
                .unwrap();
            assert_eq!(grid.read().alive_cells(), vec![(1, 2), (2, 2), (3, 2)]);
        }
    }
}
