use hashbrown::HashMap;

use cubelit_mesh_cpu::PackedVertex;

/// Opaque id of an uploaded buffer pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GpuHandle(pub u64);

/// Receiver of finished meshes. Called only from the thread that drains results.
pub trait GpuSink {
    fn upload(&mut self, vertices: &[PackedVertex], indices: &[u32]) -> GpuHandle;
    fn release(&mut self, handle: GpuHandle);
}

/// Sink that only remembers sizes; for headless runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    next: u64,
    live: HashMap<GpuHandle, (usize, usize)>,
    pub uploads: usize,
    pub releases: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(vertices, indices)` of a live buffer.
    pub fn get(&self, handle: GpuHandle) -> Option<(usize, usize)> {
        self.live.get(&handle).copied()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_bytes(&self) -> usize {
        self.live
            .values()
            .map(|&(v, i)| v * std::mem::size_of::<PackedVertex>() + i * 4)
            .sum()
    }
}

impl GpuSink for MemorySink {
    fn upload(&mut self, vertices: &[PackedVertex], indices: &[u32]) -> GpuHandle {
        self.next += 1;
        let handle = GpuHandle(self.next);
        self.live.insert(handle, (vertices.len(), indices.len()));
        self.uploads += 1;
        handle
    }

    fn release(&mut self, handle: GpuHandle) {
        if self.live.remove(&handle).is_some() {
            self.releases += 1;
        }
    }
}
