use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use cubelit_blocks::BlockRegistry;
use cubelit_chunk::{Subchunk, SubchunkCoord, SubchunkMap};
use cubelit_lighting::LightSettings;
use cubelit_mesh_cpu::{MeshSettings, NeighborHalo, SnapshotState, mesh_halo, prepare_snapshot};

fn load_registry() -> BlockRegistry {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    BlockRegistry::load_from_path(root.join("../../assets/blocks.toml")).unwrap()
}

// Rolling terrain with a few decorations, 16³ center plus neighbors.
fn terrain(reg: &BlockRegistry) -> SubchunkMap {
    let stone = reg.id_by_name("stone").unwrap();
    let grass = reg.id_by_name("grass").unwrap();
    let flower = reg.id_by_name("flower").unwrap();
    let mut map = SubchunkMap::new(16);
    for cy in -1..=1 {
        for cz in -1..=1 {
            for cx in -1..=1 {
                map.insert(SubchunkCoord::new(cx, cy, cz), Subchunk::new(16)).unwrap();
            }
        }
    }
    for wz in -16..32 {
        for wx in -16..32 {
            let h = 6 + ((wx as f32 * 0.3).sin() * 3.0 + (wz as f32 * 0.2).cos() * 3.0) as i32;
            for wy in -16..h {
                map.set_block_world(wx, wy, wz, stone, 0);
            }
            map.set_block_world(wx, h, wz, grass, 0);
            if (wx * 7 + wz * 13) % 11 == 0 {
                map.set_block_world(wx, h + 1, wz, flower, 0);
            }
        }
    }
    map
}

fn bench_mesh_subchunk(c: &mut Criterion) {
    let reg = load_registry();
    let map = terrain(&reg);
    let coord = SubchunkCoord::new(0, 0, 0);
    let mut group = c.benchmark_group("mesh_subchunk");
    group.measurement_time(Duration::from_secs(5));
    for (name, settings) in [
        ("smooth_ao_batched", MeshSettings::default()),
        ("smooth_ao_scalar", MeshSettings { batched: false, ..Default::default() }),
        (
            "flat",
            MeshSettings {
                light: LightSettings { smooth_lighting: false, ambient_occlusion: false },
                ..Default::default()
            },
        ),
    ] {
        let mut halo = NeighborHalo::new(16);
        group.bench_function(name, |b| {
            b.iter(|| {
                let state = prepare_snapshot(coord, &map, &settings, &mut halo);
                assert_eq!(state, SnapshotState::Ready);
                black_box(mesh_halo(&halo, &reg, &settings, |_| {}));
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mesh_subchunk);
criterion_main!(benches);
