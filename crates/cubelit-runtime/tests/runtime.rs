use std::sync::{Arc, RwLock};
use std::time::Duration;

use cubelit_blocks::{AIR, BlockId, BlockRegistry};
use cubelit_chunk::{Subchunk, SubchunkCoord, SubchunkMap};
use cubelit_mesh_cpu::{BuildOutcome, HaloFiller, MeshSettings, build_subchunk};
use cubelit_runtime::{MemorySink, MeshPhase, Runtime, RuntimeConfig};

const STONE: BlockId = 1;
const SIZE: usize = 8;
const WAIT: Duration = Duration::from_secs(10);
const ORIGIN: SubchunkCoord = SubchunkCoord::new(0, 0, 0);

const BLOCKS: &str = r#"
    [atlas]
    tiles_x = 2
    tiles_y = 2

    [[blocks]]
    name = "stone"
    id = 1
    textures = { all = [1, 0] }
"#;

fn settings() -> MeshSettings {
    MeshSettings {
        filler: HaloFiller {
            world_floor_y: i32::MIN,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn runtime() -> Runtime {
    let reg = BlockRegistry::from_toml_str(BLOCKS).expect("test registry");
    let world = Arc::new(RwLock::new(SubchunkMap::new(SIZE)));
    Runtime::new(world, Arc::new(reg), settings(), RuntimeConfig { workers: 2 })
        .expect("thread pool")
}

fn sub_with(cells: &[(usize, usize, usize)]) -> Subchunk {
    let mut sub = Subchunk::new(SIZE);
    for &(x, y, z) in cells {
        sub.set_block(x, y, z, STONE, 0);
    }
    sub
}

#[test]
fn lone_block_uploads_six_quads() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, sub_with(&[(3, 3, 3)])).unwrap();
    let stats = rt.finish(&mut sink, WAIT);
    assert_eq!(stats.applied, 1);

    let slot = rt.slot(ORIGIN).unwrap();
    assert!(slot.has_render_opaque());
    assert!(!slot.has_render_translucent());
    assert_eq!(slot.phase.get(), MeshPhase::Uploaded);
    assert_eq!(slot.missing.count(), 26);
    assert_eq!(sink.get(slot.opaque.unwrap()), Some((24, 36)));

    rt.end_frame();
    assert_eq!(rt.slot(ORIGIN).unwrap().phase.get(), MeshPhase::Idle);
}

#[test]
fn empty_subchunk_gets_no_buffers() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, Subchunk::new(SIZE)).unwrap();
    rt.finish(&mut sink, WAIT);
    let slot = rt.slot(ORIGIN).unwrap();
    assert!(!slot.has_render_opaque());
    assert_eq!(sink.uploads, 0);
}

#[test]
fn arriving_neighbor_clears_missing_bit() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, sub_with(&[(SIZE - 1, 0, 0)])).unwrap();
    rt.finish(&mut sink, WAIT);
    let first = rt.slot(ORIGIN).unwrap().applied;
    assert!(rt.slot(ORIGIN).unwrap().missing.contains(1, 0, 0));

    // Solid wall against +X hides the block's east face.
    let east = SubchunkCoord::new(1, 0, 0);
    let wall: Vec<_> = (0..SIZE)
        .flat_map(|y| (0..SIZE).map(move |z| (0, y, z)))
        .collect();
    rt.load_subchunk(east, sub_with(&wall)).unwrap();
    rt.finish(&mut sink, WAIT);

    let slot = rt.slot(ORIGIN).unwrap();
    assert!(slot.applied > first);
    assert!(!slot.missing.contains(1, 0, 0));
    assert_eq!(sink.get(slot.opaque.unwrap()), Some((20, 30)));
}

#[test]
fn border_edit_remeshes_neighbor() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    let east = SubchunkCoord::new(1, 0, 0);
    rt.load_subchunk(ORIGIN, sub_with(&[(SIZE - 1, 2, 2)])).unwrap();
    rt.load_subchunk(east, Subchunk::new(SIZE)).unwrap();
    rt.finish(&mut sink, WAIT);
    let before = rt.slot(ORIGIN).unwrap().applied;
    assert_eq!(sink.get(rt.slot(ORIGIN).unwrap().opaque.unwrap()), Some((24, 36)));

    // First column of the east subchunk sits in the origin's halo.
    assert!(rt.set_block(SIZE as i32, 2, 2, STONE, 0));
    rt.finish(&mut sink, WAIT);
    let slot = rt.slot(ORIGIN).unwrap();
    assert!(slot.applied > before);
    assert_eq!(sink.get(slot.opaque.unwrap()), Some((20, 30)));
    assert!(rt.slot(east).unwrap().has_render_opaque());
}

#[test]
fn interior_edit_leaves_neighbors_alone() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    let east = SubchunkCoord::new(1, 0, 0);
    rt.load_subchunk(ORIGIN, Subchunk::new(SIZE)).unwrap();
    rt.load_subchunk(east, sub_with(&[(4, 4, 4)])).unwrap();
    rt.finish(&mut sink, WAIT);
    let east_gen = rt.slot(east).unwrap().applied;

    assert!(rt.set_block(3, 3, 3, STONE, 0));
    rt.finish(&mut sink, WAIT);
    assert_eq!(rt.slot(east).unwrap().applied, east_gen);
    assert!(rt.slot(ORIGIN).unwrap().has_render_opaque());
}

#[test]
fn clearing_last_block_releases_buffers() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, sub_with(&[(1, 1, 1)])).unwrap();
    rt.finish(&mut sink, WAIT);
    assert_eq!(sink.live_count(), 1);

    assert!(rt.set_block(1, 1, 1, AIR, 0));
    rt.finish(&mut sink, WAIT);
    assert_eq!(sink.live_count(), 0);
    assert!(!rt.slot(ORIGIN).unwrap().has_render_opaque());
}

#[test]
fn unload_releases_and_forgets() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, sub_with(&[(1, 1, 1)])).unwrap();
    rt.finish(&mut sink, WAIT);
    assert!(rt.unload_subchunk(ORIGIN, &mut sink).is_some());
    assert_eq!(sink.live_count(), 0);
    assert!(rt.slot(ORIGIN).is_none());
    assert!(!rt.set_block(1, 1, 1, STONE, 0));
}

#[test]
fn unload_during_build_drops_result() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, sub_with(&[(1, 1, 1)])).unwrap();
    rt.unload_subchunk(ORIGIN, &mut sink);
    // Whatever the worker produced belongs to a slot that no longer exists.
    std::thread::sleep(Duration::from_millis(200));
    let stats = rt.drain(&mut sink);
    assert_eq!(stats.applied, 0);
    assert_eq!(sink.uploads, 0);
}

#[test]
fn burst_of_edits_converges_to_final_state() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    rt.load_subchunk(ORIGIN, Subchunk::new(SIZE)).unwrap();
    for i in 0..SIZE as i32 {
        rt.set_block(i, 1, 1, STONE, 0);
        rt.set_block(i, 3, i, STONE, 0);
    }
    rt.finish(&mut sink, WAIT);
    let (queued, running) = rt.queue_debug_counts();
    assert_eq!((queued, running), (0, 0));

    let expected = {
        let map = rt.world().read().unwrap();
        match build_subchunk(ORIGIN, &*map, rt.registry(), &rt.settings()) {
            BuildOutcome::Built(mesh) => (mesh.opaque.vertices.len(), mesh.opaque.indices.len()),
            other => panic!("expected a mesh, got {other:?}"),
        }
    };
    let slot = rt.slot(ORIGIN).unwrap();
    assert_eq!(slot.inflight, None);
    assert_eq!(sink.get(slot.opaque.unwrap()), Some(expected));
}

#[test]
fn changing_settings_remeshes_everything() {
    let mut rt = runtime();
    let mut sink = MemorySink::new();
    for c in [ORIGIN, SubchunkCoord::new(0, 1, 0)] {
        rt.load_subchunk(c, sub_with(&[(2, 2, 2)])).unwrap();
    }
    rt.finish(&mut sink, WAIT);
    let applied: Vec<u64> = rt.slots().map(|(_, s)| s.applied).collect();

    rt.set_settings(MeshSettings {
        fullbright: true,
        ..rt.settings()
    });
    rt.finish(&mut sink, WAIT);
    for ((_, s), before) in rt.slots().zip(applied) {
        assert!(s.applied > before);
    }
    assert_eq!(sink.live_count(), 2);
}
