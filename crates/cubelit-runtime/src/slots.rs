use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use cubelit_blocks::RenderLayer;
use cubelit_chunk::SubchunkCoord;
use cubelit_mesh_cpu::NeighborMask;
use hashbrown::HashMap;

use crate::sink::GpuHandle;

/// Build lifecycle of one subchunk's mesh.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MeshPhase {
    Idle = 0,
    BuildingOpaque = 1,
    BuildingTranslucent = 2,
    Uploaded = 3,
}

impl MeshPhase {
    #[inline]
    pub fn from_u8(v: u8) -> MeshPhase {
        match v {
            1 => MeshPhase::BuildingOpaque,
            2 => MeshPhase::BuildingTranslucent,
            3 => MeshPhase::Uploaded,
            _ => MeshPhase::Idle,
        }
    }

    #[inline]
    pub fn building(layer: RenderLayer) -> MeshPhase {
        match layer {
            RenderLayer::Opaque => MeshPhase::BuildingOpaque,
            RenderLayer::Translucent => MeshPhase::BuildingTranslucent,
        }
    }
}

/// Phase cell shared between a slot and the worker building it.
#[derive(Clone, Debug, Default)]
pub struct PhaseCell(Arc<AtomicU8>);

impl PhaseCell {
    #[inline]
    pub fn get(&self) -> MeshPhase {
        MeshPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, phase: MeshPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    /// Moves to `to` only if still at `from`; a worker may have moved on meanwhile.
    #[inline]
    pub fn transition(&self, from: MeshPhase, to: MeshPhase) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug, Default)]
pub struct MeshSlot {
    /// Newest generation asked for.
    pub requested: u64,
    /// Generation currently being built, at most one.
    pub inflight: Option<u64>,
    /// Generation whose result is on the GPU.
    pub applied: u64,
    pub phase: PhaseCell,
    pub opaque: Option<GpuHandle>,
    pub translucent: Option<GpuHandle>,
    /// Neighbors that were missing in the applied build.
    pub missing: NeighborMask,
}

impl MeshSlot {
    #[inline]
    pub fn has_render_opaque(&self) -> bool {
        self.opaque.is_some()
    }

    #[inline]
    pub fn has_render_translucent(&self) -> bool {
        self.translucent.is_some()
    }

    #[inline]
    pub fn handle_mut(&mut self, layer: RenderLayer) -> &mut Option<GpuHandle> {
        match layer {
            RenderLayer::Opaque => &mut self.opaque,
            RenderLayer::Translucent => &mut self.translucent,
        }
    }

    /// Both handles, leaving the slot without buffers.
    pub fn take_handles(&mut self) -> impl Iterator<Item = GpuHandle> {
        [self.opaque.take(), self.translucent.take()].into_iter().flatten()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Start a build with this generation.
    Submit(u64),
    /// A build is already running; it will be followed by one for the newest request.
    Coalesced,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Acceptance {
    /// Result is newer than what is on the GPU and belongs to the current slot.
    pub apply: bool,
    /// Generation to build next, when requests arrived during the build.
    pub resubmit: Option<u64>,
}

/// Per-subchunk generation bookkeeping. Owned by the draining thread.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: HashMap<SubchunkCoord, MeshSlot>,
    next_gen: u64,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, coord: SubchunkCoord) -> RequestOutcome {
        self.next_gen += 1;
        let generation = self.next_gen;
        let slot = self.slots.entry(coord).or_default();
        slot.requested = generation;
        if slot.inflight.is_some() {
            return RequestOutcome::Coalesced;
        }
        slot.inflight = Some(generation);
        RequestOutcome::Submit(generation)
    }

    /// Settles a finished build of `generation`.
    pub fn accept(&mut self, coord: SubchunkCoord, generation: u64) -> Acceptance {
        let Some(slot) = self.slots.get_mut(&coord) else {
            return Acceptance {
                apply: false,
                resubmit: None,
            };
        };
        if slot.inflight != Some(generation) {
            // Left over from before the slot was dropped and recreated.
            return Acceptance {
                apply: false,
                resubmit: None,
            };
        }
        slot.inflight = None;
        let apply = generation > slot.applied;
        if apply {
            slot.applied = generation;
        }
        let resubmit = if slot.requested > generation {
            slot.inflight = Some(slot.requested);
            Some(slot.requested)
        } else {
            None
        };
        Acceptance { apply, resubmit }
    }

    #[inline]
    pub fn get(&self, coord: SubchunkCoord) -> Option<&MeshSlot> {
        self.slots.get(&coord)
    }

    #[inline]
    pub fn get_mut(&mut self, coord: SubchunkCoord) -> Option<&mut MeshSlot> {
        self.slots.get_mut(&coord)
    }

    pub fn remove(&mut self, coord: SubchunkCoord) -> Option<MeshSlot> {
        self.slots.remove(&coord)
    }

    pub fn inflight_count(&self) -> usize {
        self.slots.values().filter(|s| s.inflight.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SubchunkCoord, &MeshSlot)> {
        self.slots.iter().map(|(c, s)| (*c, s))
    }

    pub fn coords(&self) -> Vec<SubchunkCoord> {
        self.slots.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const C: SubchunkCoord = SubchunkCoord::new(0, 0, 0);

    #[test]
    fn requests_during_build_coalesce() {
        let mut t = SlotTable::new();
        let RequestOutcome::Submit(g1) = t.request(C) else {
            panic!("first request must submit");
        };
        assert_eq!(t.request(C), RequestOutcome::Coalesced);
        assert_eq!(t.request(C), RequestOutcome::Coalesced);
        let acc = t.accept(C, g1);
        assert!(acc.apply);
        let g3 = acc.resubmit.expect("latest request resubmitted");
        assert_eq!(g3, t.get(C).unwrap().requested);
        let acc = t.accept(C, g3);
        assert_eq!(acc, Acceptance { apply: true, resubmit: None });
        assert_eq!(t.inflight_count(), 0);
    }

    #[test]
    fn results_for_a_dropped_slot_are_stale() {
        let mut t = SlotTable::new();
        let RequestOutcome::Submit(old) = t.request(C) else { unreachable!() };
        t.remove(C);
        let RequestOutcome::Submit(new) = t.request(C) else { unreachable!() };
        assert!(!t.accept(C, old).apply);
        assert_eq!(t.get(C).unwrap().inflight, Some(new));
        assert!(t.accept(C, new).apply);
    }

    #[test]
    fn phase_cell_round_trips() {
        let cell = PhaseCell::default();
        assert_eq!(cell.get(), MeshPhase::Idle);
        for p in [MeshPhase::BuildingOpaque, MeshPhase::BuildingTranslucent, MeshPhase::Uploaded] {
            cell.set(p);
            assert_eq!(cell.get(), p);
        }
    }

    proptest! {
        // Whatever the interleaving, applied generations only grow and at most one
        // build is ever in flight per slot.
        #[test]
        fn applied_generation_is_monotonic(ops in proptest::collection::vec(any::<bool>(), 1..64)) {
            let mut t = SlotTable::new();
            let mut running: Option<u64> = None;
            let mut last_applied = 0u64;
            for request in ops {
                if request || running.is_none() {
                    if let RequestOutcome::Submit(g) = t.request(C) {
                        prop_assert!(running.is_none());
                        running = Some(g);
                    }
                } else if let Some(g) = running.take() {
                    let acc = t.accept(C, g);
                    if acc.apply {
                        prop_assert!(g > last_applied);
                        last_applied = g;
                    }
                    running = acc.resubmit;
                }
                prop_assert_eq!(t.get(C).unwrap().inflight, running);
            }
        }
    }
}
