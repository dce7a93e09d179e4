//! Remesh scheduling: worker pool, per-subchunk generation guard and GPU handoff.
#![forbid(unsafe_code)]

mod halo_pool;
mod sink;
mod slots;

pub use halo_pool::{HaloPool, PooledHalo};
pub use sink::{GpuHandle, GpuSink, MemorySink};
pub use slots::{Acceptance, MeshPhase, MeshSlot, PhaseCell, RequestOutcome, SlotTable};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use cubelit_blocks::{BlockId, BlockMeta, BlockRegistry, RenderLayer};
use cubelit_chunk::{Subchunk, SubchunkCoord, SubchunkMap, SubchunkSource};
use cubelit_mesh_cpu::{MeshSettings, SnapshotState, SubchunkMesh, log_mesh_perf, mesh_halo, prepare_snapshot};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Subchunk store shared between the owner and the mesh workers.
pub type SharedWorld = Arc<RwLock<SubchunkMap>>;

#[derive(Clone, Debug)]
pub struct BuildJob {
    pub coord: SubchunkCoord,
    pub generation: u64,
    pub settings: MeshSettings,
    pub phase: PhaseCell,
}

#[derive(Debug)]
pub enum JobResult {
    Built(SubchunkMesh),
    Empty,
    /// Not loaded by the time the job ran.
    Missing,
    Skipped,
}

#[derive(Debug)]
pub struct JobOut {
    pub coord: SubchunkCoord,
    pub generation: u64,
    pub result: JobResult,
    pub t_total_us: u32,
}

/// What one drain pass did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub applied: usize,
    pub stale: usize,
    pub resubmitted: usize,
    pub uploaded_bytes: usize,
}

impl DrainStats {
    fn merge(&mut self, o: DrainStats) {
        self.applied += o.applied;
        self.stale += o.stale;
        self.resubmitted += o.resubmitted;
        self.uploaded_bytes += o.uploaded_bytes;
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RuntimeConfig {
    /// Mesh worker threads; 0 picks one less than the available cores.
    pub workers: usize,
}

fn elapsed_us(start: Instant) -> u32 {
    start.elapsed().as_micros().min(u128::from(u32::MAX)) as u32
}

fn process_build_job(
    job: BuildJob,
    world: &RwLock<SubchunkMap>,
    reg: &BlockRegistry,
    halo_pool: &HaloPool,
) -> JobOut {
    let BuildJob {
        coord,
        generation,
        settings,
        phase,
    } = job;
    let t0 = Instant::now();
    let finish = |result| JobOut {
        coord,
        generation,
        result,
        t_total_us: elapsed_us(t0),
    };

    // The read lock is held only while copying into the halo.
    let map = match world.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    let mut halo = halo_pool.acquire(map.subchunk_size());
    let state = prepare_snapshot(coord, &*map, &settings, &mut halo);
    drop(map);
    match state {
        SnapshotState::Ready => {}
        SnapshotState::Empty => return finish(JobResult::Empty),
        SnapshotState::Skipped => return finish(JobResult::Skipped),
        SnapshotState::Missing => return finish(JobResult::Missing),
    }
    let halo_us = elapsed_us(t0);

    let mut mesh = mesh_halo(&halo, reg, &settings, |layer| phase.set(MeshPhase::building(layer)));
    drop(halo);
    mesh.stats.halo_us = halo_us;
    log_mesh_perf(coord, &mesh.stats);
    finish(JobResult::Built(mesh))
}

/// Swaps a finished build into `slot`, returning the bytes uploaded.
fn install(slot: &mut MeshSlot, result: JobResult, sink: &mut dyn GpuSink) -> usize {
    let mut uploaded = 0;
    match result {
        JobResult::Built(mesh) => {
            for layer in [RenderLayer::Opaque, RenderLayer::Translucent] {
                let build = mesh.layer(layer);
                let handle = slot.handle_mut(layer);
                if let Some(old) = handle.take() {
                    sink.release(old);
                }
                if !build.is_empty() {
                    *handle = Some(sink.upload(&build.vertices, &build.indices));
                    uploaded += build.vertex_bytes().len() + build.indices.len() * 4;
                }
            }
            slot.missing = mesh.missing;
        }
        JobResult::Empty | JobResult::Missing => {
            for h in slot.take_handles() {
                sink.release(h);
            }
            slot.missing = Default::default();
        }
        JobResult::Skipped => {}
    }
    uploaded
}

pub struct Runtime {
    world: SharedWorld,
    reg: Arc<BlockRegistry>,
    settings: MeshSettings,
    slots: SlotTable,
    job_tx: Sender<BuildJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    halo_pool: Arc<HaloPool>,
    q_jobs: Arc<AtomicUsize>,
    inflight_jobs: Arc<AtomicUsize>,
    pub workers: usize,
    #[cfg(test)]
    on_submit: Option<Box<dyn Fn(&BuildJob)>>,
}

impl Runtime {
    pub fn new(
        world: SharedWorld,
        reg: Arc<BlockRegistry>,
        settings: MeshSettings,
        config: RuntimeConfig,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let (job_tx, job_rx) = unbounded::<BuildJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();

        let workers = if config.workers > 0 {
            config.workers
        } else {
            thread::available_parallelism()
                .map(|n| n.get().saturating_sub(1))
                .unwrap_or(4)
                .max(1)
        };
        let halo_pool = HaloPool::with_capacity_from_workers(workers);
        let q_jobs = Arc::new(AtomicUsize::new(0));
        let inflight_jobs = Arc::new(AtomicUsize::new(0));

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("cubelit-mesh-{i}"))
                .build()?,
        );
        for _ in 0..workers {
            let rx = job_rx.clone();
            let tx = res_tx.clone();
            let world = world.clone();
            let reg = reg.clone();
            let halo_pool = halo_pool.clone();
            let q_jobs = q_jobs.clone();
            let inflight_jobs = inflight_jobs.clone();
            pool.spawn(move || {
                while let Ok(job) = rx.recv() {
                    q_jobs.fetch_sub(1, Ordering::Relaxed);
                    inflight_jobs.fetch_add(1, Ordering::Relaxed);
                    let out = process_build_job(job, &world, &reg, &halo_pool);
                    inflight_jobs.fetch_sub(1, Ordering::Relaxed);
                    if tx.send(out).is_err() {
                        break;
                    }
                }
            });
        }
        log::info!(target: "runtime", "mesh runtime started with {workers} workers");

        Ok(Self {
            world,
            reg,
            settings,
            slots: SlotTable::new(),
            job_tx,
            res_rx,
            _pool: pool,
            halo_pool,
            q_jobs,
            inflight_jobs,
            workers,
            #[cfg(test)]
            on_submit: None,
        })
    }

    #[inline]
    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    #[inline]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.reg
    }

    #[inline]
    pub fn settings(&self) -> MeshSettings {
        self.settings
    }

    /// Applies to builds requested from now on; every tracked subchunk is remeshed.
    pub fn set_settings(&mut self, settings: MeshSettings) {
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        for coord in self.slots.coords() {
            self.request_remesh(coord);
        }
    }

    #[inline]
    pub fn slot(&self, coord: SubchunkCoord) -> Option<&MeshSlot> {
        self.slots.get(coord)
    }

    pub fn slots(&self) -> impl Iterator<Item = (SubchunkCoord, &MeshSlot)> {
        self.slots.iter()
    }

    fn write_world(&self) -> std::sync::RwLockWriteGuard<'_, SubchunkMap> {
        match self.world.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn submit(&self, coord: SubchunkCoord, generation: u64, phase: PhaseCell) {
        self.q_jobs.fetch_add(1, Ordering::Relaxed);
        let job = BuildJob {
            coord,
            generation,
            settings: self.settings,
            phase,
        };
        #[cfg(test)]
        if let Some(hook) = &self.on_submit {
            hook(&job);
        }
        if self.job_tx.send(job).is_err() {
            self.q_jobs.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Schedules a rebuild; folds into the running one if the subchunk is already building.
    pub fn request_remesh(&mut self, coord: SubchunkCoord) {
        match self.slots.request(coord) {
            RequestOutcome::Submit(generation) => {
                let phase = self.slots.get(coord).map(|s| s.phase.clone()).unwrap_or_default();
                self.submit(coord, generation, phase);
            }
            RequestOutcome::Coalesced => {
                log::debug!(target: "runtime", "{coord}: remesh coalesced");
            }
        }
    }

    /// Inserts a subchunk, meshes it, and remeshes neighbors that were built without it.
    pub fn load_subchunk(&mut self, coord: SubchunkCoord, sub: Subchunk) -> Result<(), Subchunk> {
        self.write_world().insert(coord, sub)?;
        self.request_remesh(coord);
        let waiting: Vec<SubchunkCoord> = coord
            .neighbors()
            .filter_map(|(dx, dy, dz, n)| {
                let slot = self.slots.get(n)?;
                // A running build may have snapshotted before the insert.
                (slot.inflight.is_some() || slot.missing.contains(-dx, -dy, -dz)).then_some(n)
            })
            .collect();
        for n in waiting {
            log::debug!(target: "runtime", "{n}: neighbor {coord} arrived, remeshing");
            self.request_remesh(n);
        }
        Ok(())
    }

    /// Drops a subchunk and its GPU buffers.
    pub fn unload_subchunk(&mut self, coord: SubchunkCoord, sink: &mut dyn GpuSink) -> Option<Subchunk> {
        if let Some(mut slot) = self.slots.remove(coord) {
            for h in slot.take_handles() {
                sink.release(h);
            }
        }
        self.write_world().remove(coord)
    }

    /// Writes one block and remeshes the owning subchunk plus every neighbor whose halo
    /// contains the cell. Returns false if the cell isn't loaded.
    pub fn set_block(&mut self, wx: i32, wy: i32, wz: i32, id: BlockId, meta: BlockMeta) -> bool {
        let (size, coord, local) = {
            let mut map = self.write_world();
            let size = map.subchunk_size();
            let (coord, local) = SubchunkCoord::from_world(wx, wy, wz, size);
            if map.set_block_world(wx, wy, wz, id, meta).is_none() {
                return false;
            }
            (size, coord, local)
        };
        self.request_remesh(coord);
        let side = |l: usize| -> &'static [i32] {
            match (l == 0, l + 1 == size) {
                (true, true) => &[-1, 0, 1],
                (true, false) => &[-1, 0],
                (false, true) => &[0, 1],
                (false, false) => &[0],
            }
        };
        for &dy in side(local[1]) {
            for &dz in side(local[2]) {
                for &dx in side(local[0]) {
                    if (dx, dy, dz) == (0, 0, 0) {
                        continue;
                    }
                    let n = coord.offset(dx, dy, dz);
                    if self.slots.get(n).is_some() {
                        self.request_remesh(n);
                    }
                }
            }
        }
        true
    }

    /// Applies finished builds without blocking.
    pub fn drain(&mut self, sink: &mut dyn GpuSink) -> DrainStats {
        let mut stats = DrainStats::default();
        while let Ok(out) = self.res_rx.try_recv() {
            stats.merge(self.apply(out, sink));
        }
        stats
    }

    /// Blocks until no build is queued or running, or `timeout` passes.
    pub fn finish(&mut self, sink: &mut dyn GpuSink, timeout: Duration) -> DrainStats {
        let deadline = Instant::now() + timeout;
        let mut stats = DrainStats::default();
        while self.slots.inflight_count() > 0 {
            let now = Instant::now();
            if now >= deadline {
                log::warn!(
                    target: "runtime",
                    "finish timed out with {} builds outstanding",
                    self.slots.inflight_count()
                );
                break;
            }
            match self.res_rx.recv_timeout(deadline - now) {
                Ok(out) => stats.merge(self.apply(out, sink)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        stats
    }

    fn apply(&mut self, out: JobOut, sink: &mut dyn GpuSink) -> DrainStats {
        let mut stats = DrainStats::default();
        let JobOut {
            coord,
            generation,
            result,
            t_total_us,
        } = out;
        let acc = self.slots.accept(coord, generation);
        if !acc.apply {
            log::debug!(target: "runtime", "{coord}: dropping stale build gen={generation}");
            stats.stale += 1;
        } else if let Some(slot) = self.slots.get_mut(coord) {
            stats.uploaded_bytes += install(slot, result, sink);
            // A follow-up build owns the phase from the moment it is queued.
            slot.phase.set(if acc.resubmit.is_some() {
                MeshPhase::Idle
            } else {
                MeshPhase::Uploaded
            });
            stats.applied += 1;
            log::trace!(target: "runtime", "{coord}: applied gen={generation} in {t_total_us}us");
        }
        if let Some(next) = acc.resubmit {
            let phase = self.slots.get(coord).map(|s| s.phase.clone()).unwrap_or_default();
            self.submit(coord, next, phase);
            stats.resubmitted += 1;
        }
        stats
    }

    /// Moves `Uploaded` slots back to `Idle` once the frame that consumed them is done.
    pub fn end_frame(&mut self) {
        for (_, slot) in self.slots.iter() {
            slot.phase.transition(MeshPhase::Uploaded, MeshPhase::Idle);
        }
    }

    pub fn queue_debug_counts(&self) -> (usize, usize) {
        (
            self.q_jobs.load(Ordering::Relaxed),
            self.inflight_jobs.load(Ordering::Relaxed),
        )
    }

    #[inline]
    pub fn halo_pool(&self) -> &HaloPool {
        &self.halo_pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: SubchunkCoord = SubchunkCoord::new(0, 0, 0);

    // Runtime with no workers attached: the test plays the worker through the channels.
    fn detached() -> (Runtime, Receiver<BuildJob>, Sender<JobOut>) {
        let (job_tx, job_rx) = unbounded();
        let (res_tx, res_rx) = unbounded();
        let rt = Runtime {
            world: Arc::new(RwLock::new(SubchunkMap::new(4))),
            reg: Arc::new(BlockRegistry::default()),
            settings: MeshSettings::default(),
            slots: SlotTable::new(),
            job_tx,
            res_rx,
            _pool: Arc::new(ThreadPoolBuilder::new().num_threads(1).build().unwrap()),
            halo_pool: HaloPool::with_capacity_from_workers(1),
            q_jobs: Arc::new(AtomicUsize::new(0)),
            inflight_jobs: Arc::new(AtomicUsize::new(0)),
            workers: 0,
            on_submit: None,
        };
        (rt, job_rx, res_tx)
    }

    fn finished(job: &BuildJob) -> JobOut {
        JobOut {
            coord: job.coord,
            generation: job.generation,
            result: JobResult::Empty,
            t_total_us: 0,
        }
    }

    #[test]
    fn resubmitted_build_keeps_its_phase() {
        let (mut rt, jobs, results) = detached();
        let mut sink = MemorySink::new();
        rt.request_remesh(ORIGIN);
        let first = jobs.try_recv().unwrap();
        rt.request_remesh(ORIGIN);
        assert!(jobs.try_recv().is_err());

        // A worker that starts the follow-up the instant it is queued.
        rt.on_submit = Some(Box::new(|job: &BuildJob| job.phase.set(MeshPhase::BuildingOpaque)));
        results.send(finished(&first)).unwrap();
        let stats = rt.drain(&mut sink);
        assert_eq!((stats.applied, stats.resubmitted), (1, 1));
        assert_eq!(rt.slot(ORIGIN).unwrap().phase.get(), MeshPhase::BuildingOpaque);

        let second = jobs.try_recv().unwrap();
        assert!(second.generation > first.generation);
        rt.on_submit = None;
        results.send(finished(&second)).unwrap();
        rt.drain(&mut sink);
        assert_eq!(rt.slot(ORIGIN).unwrap().phase.get(), MeshPhase::Uploaded);
    }

    #[test]
    fn end_frame_leaves_running_builds_alone() {
        let (mut rt, jobs, _results) = detached();
        rt.request_remesh(ORIGIN);
        let job = jobs.try_recv().unwrap();
        job.phase.set(MeshPhase::BuildingTranslucent);
        rt.end_frame();
        assert_eq!(rt.slot(ORIGIN).unwrap().phase.get(), MeshPhase::BuildingTranslucent);
    }
}
