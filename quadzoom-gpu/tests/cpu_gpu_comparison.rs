//! Drives the quadtree with the GPU backend and compares tile images against
//! the host renderer.

use quadzoom_compute::{ComputeBackend, QuadtreeManager, TileId, TileState};
use quadzoom_core::{render_tile, Bounds, Viewport};
use quadzoom_gpu::{GpuAvailability, GpuComputeBackend, GpuContext};

const RESOLUTION: u32 = 64;
const MAX_FRAMES: usize = 100;

fn try_backend() -> Option<GpuComputeBackend> {
    match pollster::block_on(GpuContext::try_init()) {
        GpuAvailability::Available(ctx) => {
            Some(GpuComputeBackend::new(ctx, RESOLUTION).expect("kernel builds"))
        }
        GpuAvailability::Unavailable(reason) => {
            println!("Skipping test: {reason}");
            None
        }
    }
}

fn agreement(gpu: &[f32], cpu: &[f32]) -> f64 {
    let close = gpu
        .iter()
        .zip(cpu)
        .filter(|(g, c)| (**g - **c).abs() <= 0.01 * c.abs().max(1.0))
        .count();
    close as f64 / cpu.len() as f64
}

/// Update until `done` holds, blocking on the device between frames.
fn run_until<F>(m: &mut QuadtreeManager<GpuComputeBackend>, vp: &Viewport, done: F)
where
    F: Fn(&QuadtreeManager<GpuComputeBackend>) -> bool,
{
    for _ in 0..MAX_FRAMES {
        if done(m) {
            return;
        }
        m.backend().wait_idle();
        m.update(vp).expect("frame succeeds");
    }
    panic!("condition not reached in {MAX_FRAMES} frames");
}

#[test]
fn root_tile_matches_cpu() {
    let Some(backend) = try_backend() else {
        return;
    };
    let root = Bounds::new(-2.0, 2.0, -2.0, 2.0, 200.0);
    let mut m = QuadtreeManager::new(backend, root, 0.5).unwrap();
    assert_eq!(m.tiles()[0].state(), TileState::Rendering);

    // 64 texels shown across 16 px: never refines
    let vp = Viewport::new((0.0, 0.0), 0.5, 200.0, (16, 16));
    run_until(&mut m, &vp, |m| m.tiles()[0].state() == TileState::Active);
    assert_eq!(m.tiles().len(), 1);

    let gpu = pollster::block_on(m.backend().read_image(m.tiles()[0].texture())).unwrap();
    let cpu = render_tile(&root, RESOLUTION);
    let ratio = agreement(&gpu, &cpu);
    assert!(ratio >= 0.9, "agreement {:.1}%", ratio * 100.0);
}

#[test]
fn split_children_render_and_parent_retires() {
    let Some(backend) = try_backend() else {
        return;
    };
    let root = Bounds::new(-2.0, 2.0, -2.0, 2.0, 100.0);
    let mut m = QuadtreeManager::new(backend, root, 0.5).unwrap();

    // 64 texels across 128 px: pixel size 2 at the root, 1 for children,
    // 0.5 for grandchildren, so refinement stops after one split
    let vp = Viewport::new((0.0, 0.0), 0.5, 100.0, (128, 128));
    run_until(&mut m, &vp, |m| {
        m.tile(TileId::ROOT).is_none()
            && m.tiles()
                .iter()
                .all(|t| t.generation() == 2 && t.state() == TileState::Active)
    });
    assert_eq!(m.tiles().len(), 16);
    assert_eq!(m.backend().pending_count(), 0);

    let tile = m.tile(TileId::ROOT.child(0).child(3)).expect("grandchild");
    let gpu = pollster::block_on(m.backend().read_image(tile.texture())).unwrap();
    let cpu = render_tile(&tile.bounds(), RESOLUTION);
    let ratio = agreement(&gpu, &cpu);
    assert!(ratio >= 0.9, "agreement {:.1}%", ratio * 100.0);
}
