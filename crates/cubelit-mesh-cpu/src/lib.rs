//! CPU subchunk mesher: halo snapshot, face culling, per-corner AO/light and packed vertices.
#![forbid(unsafe_code)]

mod build;
pub mod constants;
mod cull;
mod emit;
mod halo;
mod mesh_build;
mod shapes;
mod vertex;

pub use build::{
    BuildOutcome, MeshSettings, MeshStats, SnapshotState, SubchunkMesh, build_subchunk,
    log_mesh_perf, mesh_halo, prepare_snapshot,
};
pub use cull::FaceCuller;
pub use emit::{corner_weight, emit_face, should_rotate};
pub use halo::{HaloFiller, NeighborHalo, NeighborMask};
pub use mesh_build::MeshBuild;
pub use shapes::{FireSupport, fire_faces};
pub use vertex::{DecodedVertex, PackedVertex, dequantize_pos, quantize_pos, quantize_uv};
