use std::cell::Cell;
use std::time::Instant;

use cubelit_blocks::{AIR, BlockId, BlockRegistry, Direction, FaceDescriptor, FaceFlags, RenderLayer, RenderType};
use cubelit_chunk::{SubchunkCoord, SubchunkSource};
use cubelit_geom::{Aabb, Vec3};
use cubelit_lighting::{
    CornerLight, FaceInputs, LightSettings, LocalSample, evaluate_corners, evaluate_corners_batched,
};

use crate::cull::FaceCuller;
use crate::emit::emit_face;
use crate::halo::{HaloFiller, NeighborHalo, NeighborMask};
use crate::mesh_build::MeshBuild;
use crate::shapes::{FireSupport, fire_faces};

thread_local! {
    // Quad counts of the previous build on this thread, per layer.
    static LAST_MESH_RESERVE: Cell<[usize; 2]> = const { Cell::new([64, 16]) };
}

/// Everything a build reads besides voxel data. Copied into each job so a toggle
/// mid-build can't mix old and new settings.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MeshSettings {
    pub light: LightSettings,
    pub fullbright: bool,
    /// Use the lane-wise corner evaluator.
    pub batched: bool,
    pub filler: HaloFiller,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            light: LightSettings::default(),
            fullbright: false,
            batched: true,
            filler: HaloFiller::default(),
        }
    }
}

/// Result of snapshotting a subchunk into a halo.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SnapshotState {
    /// The subchunk itself isn't loaded.
    Missing,
    /// Only air; both layers are cleared without meshing.
    Empty,
    /// Empty flag set while blocks are present.
    Skipped,
    Ready,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    pub opaque_quads: usize,
    pub translucent_quads: usize,
    /// Voxels dropped by the enclosed-cube shortcut.
    pub enclosed: usize,
    pub halo_us: u32,
    pub mesh_us: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SubchunkMesh {
    pub coord: Option<SubchunkCoord>,
    pub opaque: MeshBuild,
    pub translucent: MeshBuild,
    /// Subchunk-local bounds of all emitted vertices.
    pub bbox: Aabb,
    pub missing: NeighborMask,
    pub stats: MeshStats,
}

impl SubchunkMesh {
    #[inline]
    pub fn layer(&self, layer: RenderLayer) -> &MeshBuild {
        match layer {
            RenderLayer::Opaque => &self.opaque,
            RenderLayer::Translucent => &self.translucent,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opaque.is_empty() && self.translucent.is_empty()
    }
}

#[derive(Clone, Debug)]
pub enum BuildOutcome {
    Missing,
    Empty,
    Skipped,
    Built(SubchunkMesh),
}

fn elapsed_us(start: Instant) -> u32 {
    start.elapsed().as_micros().min(u128::from(u32::MAX)) as u32
}

/// Copies the subchunk at `coord` and its neighbors into `halo`.
pub fn prepare_snapshot<S: SubchunkSource + ?Sized>(
    coord: SubchunkCoord,
    src: &S,
    settings: &MeshSettings,
    halo: &mut NeighborHalo,
) -> SnapshotState {
    let Some(sub) = src.subchunk(coord) else {
        return SnapshotState::Missing;
    };
    if sub.is_empty() {
        if sub.is_consistent() {
            return SnapshotState::Empty;
        }
        debug_assert!(
            sub.is_consistent(),
            "subchunk {coord} flagged empty but holds {} blocks",
            sub.non_air_count()
        );
        log::warn!(
            target: "mesh",
            "skipping {coord}: flagged empty but holds {} blocks",
            sub.non_air_count()
        );
        return SnapshotState::Skipped;
    }
    let missing = halo.fill(coord, src, &settings.filler);
    if !missing.is_empty() {
        log::debug!(target: "mesh", "{coord}: {} neighbors missing, using filler", missing.count());
    }
    if settings.fullbright {
        halo.apply_fullbright();
    }
    SnapshotState::Ready
}

/// Meshes a filled halo: opaque layer first, then translucent. `on_phase` is told which
/// layer is about to be built.
pub fn mesh_halo(
    halo: &NeighborHalo,
    reg: &BlockRegistry,
    settings: &MeshSettings,
    mut on_phase: impl FnMut(RenderLayer),
) -> SubchunkMesh {
    let start = Instant::now();
    let [reserve_opaque, reserve_translucent] = LAST_MESH_RESERVE.with(Cell::get);
    let mut mesh = SubchunkMesh {
        coord: halo.coord(),
        missing: halo.missing(),
        ..Default::default()
    };
    mesh.opaque.reserve_quads(reserve_opaque);
    mesh.translucent.reserve_quads(reserve_translucent);

    let mut pass = LayerPass {
        reg,
        culler: FaceCuller::new(reg),
        halo,
        settings,
        sample: LocalSample::default(),
        scratch: Vec::new(),
        bounds: Aabb::EMPTY,
        enclosed: 0,
    };
    on_phase(RenderLayer::Opaque);
    pass.run(RenderLayer::Opaque, &mut mesh.opaque);
    on_phase(RenderLayer::Translucent);
    pass.run(RenderLayer::Translucent, &mut mesh.translucent);

    mesh.bbox = pass.bounds;
    mesh.stats.enclosed = pass.enclosed;
    mesh.stats.opaque_quads = mesh.opaque.quad_count();
    mesh.stats.translucent_quads = mesh.translucent.quad_count();
    mesh.stats.mesh_us = elapsed_us(start);
    let next = |q: usize| (q + q / 4).max(16);
    LAST_MESH_RESERVE.with(|c| {
        c.set([next(mesh.stats.opaque_quads), next(mesh.stats.translucent_quads)])
    });
    mesh
}

/// Snapshot and mesh in one go with a fresh halo.
pub fn build_subchunk<S: SubchunkSource + ?Sized>(
    coord: SubchunkCoord,
    src: &S,
    reg: &BlockRegistry,
    settings: &MeshSettings,
) -> BuildOutcome {
    let t0 = Instant::now();
    let mut halo = NeighborHalo::new(src.subchunk_size());
    match prepare_snapshot(coord, src, settings, &mut halo) {
        SnapshotState::Missing => BuildOutcome::Missing,
        SnapshotState::Empty => BuildOutcome::Empty,
        SnapshotState::Skipped => BuildOutcome::Skipped,
        SnapshotState::Ready => {
            let halo_us = elapsed_us(t0);
            let mut mesh = mesh_halo(&halo, reg, settings, |_| {});
            mesh.stats.halo_us = halo_us;
            log_mesh_perf(coord, &mesh.stats);
            BuildOutcome::Built(mesh)
        }
    }
}

pub fn log_mesh_perf(coord: SubchunkCoord, stats: &MeshStats) {
    log::info!(
        target: "perf",
        "us halo={} mesh={} quads opaque={} translucent={} enclosed={} mesher_subchunk c={}",
        stats.halo_us,
        stats.mesh_us,
        stats.opaque_quads,
        stats.translucent_quads,
        stats.enclosed,
        coord
    );
}

struct LayerPass<'a> {
    reg: &'a BlockRegistry,
    culler: FaceCuller<'a>,
    halo: &'a NeighborHalo,
    settings: &'a MeshSettings,
    sample: LocalSample,
    scratch: Vec<FaceDescriptor>,
    bounds: Aabb,
    enclosed: usize,
}

impl<'a> LayerPass<'a> {
    fn run(&mut self, layer: RenderLayer, out: &mut MeshBuild) {
        let (reg, halo) = (self.reg, self.halo);
        let s = halo.size() as i32;
        for y in 0..s {
            for z in 0..s {
                for x in 0..s {
                    let id = halo.block(x, y, z);
                    if id == AIR {
                        continue;
                    }
                    let ty = reg.get(id);
                    if ty.layer != layer || !ty.is_visible() {
                        continue;
                    }
                    match ty.render {
                        RenderType::Cube | RenderType::CustomModel => {
                            if self.culler.fully_enclosed(halo, id, x, y, z) {
                                self.enclosed += 1;
                                continue;
                            }
                            self.emit_faces(out, id, [x, y, z], &ty.model.faces);
                        }
                        RenderType::Cross | RenderType::Crop => {
                            self.emit_faces(out, id, [x, y, z], &ty.model.faces);
                        }
                        RenderType::Fire => {
                            let full = |dx: i32, dy: i32, dz: i32| {
                                reg.casts_ao(halo.block(x + dx, y + dy, z + dz))
                            };
                            let support = FireSupport {
                                below: full(0, -1, 0),
                                pos_x: full(1, 0, 0),
                                neg_x: full(-1, 0, 0),
                                pos_z: full(0, 0, 1),
                                neg_z: full(0, 0, -1),
                            };
                            let mut faces = std::mem::take(&mut self.scratch);
                            fire_faces(support, &mut faces);
                            self.emit_faces(out, id, [x, y, z], &faces);
                            self.scratch = faces;
                        }
                    }
                }
            }
        }
    }

    fn emit_faces(&mut self, out: &mut MeshBuild, id: BlockId, [x, y, z]: [i32; 3], faces: &[FaceDescriptor]) {
        let origin = Vec3::from_cell(x, y, z);
        let meta = self.halo.meta(x, y, z);
        let mut sampled = false;
        for face in faces {
            if face.direction != Direction::None {
                let (dx, dy, dz) = face.direction.delta();
                let neighbor = self.halo.block(x + dx, y + dy, z + dz);
                if !self.culler.should_render(id, neighbor, face) {
                    continue;
                }
            }
            let lights = self.face_lights(&mut sampled, [x, y, z], face);
            let atlas = self.reg.face_uv(id, face.direction, meta);
            emit_face(out, &mut self.bounds, origin, face, atlas, lights);
        }
    }

    fn face_lights(&mut self, sampled: &mut bool, [x, y, z]: [i32; 3], face: &FaceDescriptor) -> [CornerLight; 4] {
        let flat = face.direction == Direction::None
            || face.flags.contains(FaceFlags::NO_AO)
            || !self.settings.light.needs_sample();
        if flat {
            let [ox, oy, oz] = face.light_offset.map(i32::from);
            return [CornerLight::flat(self.halo.light(x + ox, y + oy, z + oz)); 4];
        }
        if !*sampled {
            let (halo, reg) = (self.halo, self.reg);
            self.sample.refill(|dx, dy, dz| {
                let (nx, ny, nz) = (x + dx, y + dy, z + dz);
                (reg.casts_ao(halo.block(nx, ny, nz)), halo.light(nx, ny, nz))
            });
            *sampled = true;
        }
        let inputs = FaceInputs::gather(&self.sample, face.light_offset, &face.corner_samples);
        if self.settings.batched {
            evaluate_corners_batched(&inputs, self.settings.light)
        } else {
            evaluate_corners(&inputs, self.settings.light)
        }
    }
}
