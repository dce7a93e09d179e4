use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, bounded};
use cubelit_mesh_cpu::NeighborHalo;

/// Lock-free pool of halo buffers so workers don't reallocate `(S+2)³` arrays per job.
pub struct HaloPool {
    available_tx: Sender<NeighborHalo>,
    available_rx: Receiver<NeighborHalo>,
    allocated: AtomicUsize,
    max_halos: usize,
}

impl HaloPool {
    pub fn new(max_halos: usize) -> Self {
        debug_assert!(max_halos > 0);
        let (tx, rx) = bounded(max_halos);
        Self {
            available_tx: tx,
            available_rx: rx,
            allocated: AtomicUsize::new(0),
            max_halos,
        }
    }

    pub fn with_capacity_from_workers(worker_count: usize) -> Arc<Self> {
        Arc::new(Self::new(worker_count.max(1) * 2))
    }

    /// Takes a buffer sized for `size`, allocating one if under capacity, otherwise
    /// waiting for a release.
    pub fn acquire(&self, size: usize) -> PooledHalo<'_> {
        if let Ok(halo) = self.available_rx.try_recv() {
            return self.wrap(halo, size);
        }
        loop {
            let current = self.allocated.load(Ordering::Acquire);
            if current < self.max_halos {
                let prev = self.allocated.fetch_add(1, Ordering::AcqRel);
                if prev < self.max_halos {
                    return self.wrap(NeighborHalo::new(size), size);
                }
                self.allocated.fetch_sub(1, Ordering::AcqRel);
            }
            // The pool holds its own sender, so this only fails if it is being torn down.
            if let Ok(halo) = self.available_rx.recv() {
                return self.wrap(halo, size);
            }
        }
    }

    fn wrap(&self, mut halo: NeighborHalo, size: usize) -> PooledHalo<'_> {
        if halo.size() != size {
            halo.resize(size);
        }
        PooledHalo { halo, pool: self }
    }

    fn release(&self, halo: NeighborHalo) {
        let _ = self.available_tx.send(halo);
    }

    #[inline]
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }
}

pub struct PooledHalo<'pool> {
    halo: NeighborHalo,
    pool: &'pool HaloPool,
}

impl Deref for PooledHalo<'_> {
    type Target = NeighborHalo;

    fn deref(&self) -> &Self::Target {
        &self.halo
    }
}

impl DerefMut for PooledHalo<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.halo
    }
}

impl Drop for PooledHalo<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.halo));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_released_buffers() {
        let pool = HaloPool::new(2);
        {
            let a = pool.acquire(4);
            let b = pool.acquire(4);
            assert_eq!(a.size(), 4);
            assert_eq!(b.size(), 4);
        }
        let c = pool.acquire(8);
        assert_eq!(c.size(), 8);
        assert_eq!(pool.allocated(), 2);
    }
}
