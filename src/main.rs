mod config;
mod scene;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use cubelit_blocks::{BlockRegistry, Direction};
use cubelit_chunk::{SubchunkCoord, SubchunkMap};
use cubelit_mesh_cpu::{BuildOutcome, MeshSettings, build_subchunk};
use cubelit_runtime::{MemorySink, Runtime};
use hashbrown::HashMap;
use simplelog::{ColorChoice, CombinedLogger, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use crate::config::EngineConfig;
use crate::scene::{Scene, SceneBlocks};

#[derive(Parser)]
#[command(name = "cubelit", about = "Subchunk mesher with per-vertex AO and smooth lighting")]
struct Cli {
    /// Engine settings
    #[arg(long, default_value = "cubelit.toml")]
    config: PathBuf,
    /// Block table
    #[arg(long, default_value = "assets/blocks.toml")]
    blocks: PathBuf,
    /// Also write the log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone, Copy)]
struct SceneArgs {
    /// Subchunks around the origin along x and z
    #[arg(long, default_value_t = 2)]
    radius: i32,
    /// Vertical subchunk layers
    #[arg(long, default_value_t = 3)]
    layers: i32,
    /// Subchunk edge length
    #[arg(long, default_value_t = 16)]
    size: usize,
    #[arg(long, default_value_t = 1337)]
    seed: i32,
}

#[derive(clap::Args, Clone, Copy)]
struct ToggleArgs {
    #[arg(long)]
    no_ao: bool,
    #[arg(long)]
    no_smooth: bool,
    #[arg(long)]
    fullbright: bool,
    /// Use the scalar corner evaluator
    #[arg(long)]
    scalar: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Mesh a synthetic scene through the worker runtime and report sizes and timings
    Mesh {
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        toggles: ToggleArgs,
        /// Remesh the whole scene this many more times
        #[arg(long, default_value_t = 0)]
        repeat: u32,
    },
    /// Print decoded vertices of one subchunk
    Dump {
        #[command(flatten)]
        scene: SceneArgs,
        #[command(flatten)]
        toggles: ToggleArgs,
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        x: i32,
        #[arg(long, allow_hyphen_values = true, default_value_t = 1)]
        y: i32,
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        z: i32,
        /// Quads to print per layer
        #[arg(long, default_value_t = 4)]
        limit: usize,
    },
}

fn init_logging(log_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match log_file {
        None => env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init(),
        Some(path) => {
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    simplelog::Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, simplelog::Config::default(), File::create(path)?),
            ])?;
        }
    }
    Ok(())
}

fn apply_toggles(mut settings: MeshSettings, t: ToggleArgs) -> MeshSettings {
    if t.no_ao {
        settings.light.ambient_occlusion = false;
    }
    if t.no_smooth {
        settings.light.smooth_lighting = false;
    }
    if t.fullbright {
        settings.fullbright = true;
    }
    if t.scalar {
        settings.batched = false;
    }
    settings
}

fn make_scene(args: SceneArgs) -> Result<Scene, Box<dyn Error>> {
    if args.size == 0 || args.size > cubelit_chunk::MAX_SIZE {
        return Err(format!("--size must be in 1..={}", cubelit_chunk::MAX_SIZE).into());
    }
    if args.radius < 0 || args.layers < 1 {
        return Err("--radius must be >= 0 and --layers >= 1".into());
    }
    Ok(Scene {
        size: args.size,
        radius: args.radius,
        layers: args.layers,
        seed: args.seed,
    })
}

fn layer_totals(rt: &Runtime, sink: &MemorySink) -> [(usize, usize, usize); 2] {
    let mut totals = [(0usize, 0usize, 0usize); 2];
    for (_, slot) in rt.slots() {
        for (i, handle) in [slot.opaque, slot.translucent].into_iter().enumerate() {
            if let Some((v, idx)) = handle.and_then(|h| sink.get(h)) {
                totals[i].0 += 1;
                totals[i].1 += v;
                totals[i].2 += idx;
            }
        }
    }
    totals
}

fn run_mesh(
    reg: Arc<BlockRegistry>,
    cfg: &EngineConfig,
    settings: MeshSettings,
    scene: Scene,
    repeat: u32,
) -> Result<(), Box<dyn Error>> {
    let blocks = SceneBlocks::resolve(&reg)?;
    let t_gen = Instant::now();
    let subs = scene.generate(&blocks);
    log::info!("generated {} subchunks in {:?}", subs.len(), t_gen.elapsed());

    let world = Arc::new(RwLock::new(SubchunkMap::new(scene.size)));
    let mut rt = Runtime::new(world, reg, settings, cfg.runtime_config())?;
    let mut sink = MemorySink::new();
    let timeout = Duration::from_secs(120);

    let t0 = Instant::now();
    for (coord, sub) in subs {
        if rt.load_subchunk(coord, sub).is_err() {
            return Err(format!("subchunk {coord} has the wrong size").into());
        }
    }
    let stats = rt.finish(&mut sink, timeout);
    println!(
        "initial: {:?} workers={} applied={} stale={} resubmitted={}",
        t0.elapsed(),
        rt.workers,
        stats.applied,
        stats.stale,
        stats.resubmitted
    );

    for pass in 1..=repeat {
        let t = Instant::now();
        let coords: Vec<SubchunkCoord> = rt.slots().map(|(c, _)| c).collect();
        for c in coords {
            rt.request_remesh(c);
        }
        let stats = rt.finish(&mut sink, timeout);
        println!("remesh pass {pass}: {:?} applied={}", t.elapsed(), stats.applied);
    }
    rt.end_frame();

    for (name, (meshes, verts, indices)) in ["opaque", "translucent"].into_iter().zip(layer_totals(&rt, &sink)) {
        println!("{name:>12}: {meshes} meshes, {verts} vertices, {indices} indices");
    }
    println!(
        "{:>12}: {} live buffers, {} bytes, {} uploads, {} releases",
        "gpu",
        sink.live_count(),
        sink.live_bytes(),
        sink.uploads,
        sink.releases
    );
    // Nothing stays on the sink once the scene is gone.
    let coords: Vec<SubchunkCoord> = rt.slots().map(|(c, _)| c).collect();
    for c in coords {
        rt.unload_subchunk(c, &mut sink);
    }
    debug_assert_eq!(sink.live_count(), 0);
    Ok(())
}

fn run_dump(
    reg: &BlockRegistry,
    settings: MeshSettings,
    scene: Scene,
    coord: SubchunkCoord,
    limit: usize,
) -> Result<(), Box<dyn Error>> {
    let blocks = SceneBlocks::resolve(reg)?;
    let mut map = SubchunkMap::new(scene.size);
    for (c, sub) in scene.generate(&blocks) {
        if map.insert(c, sub).is_err() {
            return Err(format!("subchunk {c} has the wrong size").into());
        }
    }
    let mesh = match build_subchunk(coord, &map, reg, &settings) {
        BuildOutcome::Built(mesh) => mesh,
        other => {
            println!("{coord}: {other:?}");
            return Ok(());
        }
    };
    println!(
        "{coord}: bbox {:?}..{:?}, {} neighbors missing",
        mesh.bbox.min,
        mesh.bbox.max,
        mesh.missing.count()
    );
    for (name, build) in [("opaque", &mesh.opaque), ("translucent", &mesh.translucent)] {
        let mut per_dir: HashMap<Direction, usize> = HashMap::new();
        for quad in build.vertices.chunks_exact(4) {
            *per_dir.entry(quad[0].direction()).or_default() += 1;
        }
        let mut dirs: Vec<_> = per_dir.into_iter().collect();
        dirs.sort_by_key(|(d, _)| d.index());
        println!("{name}: {} quads {dirs:?}", build.quad_count());
        for (q, quad) in build.vertices.chunks_exact(4).take(limit).enumerate() {
            println!("  quad {q}");
            for v in quad {
                let d = v.decode();
                println!(
                    "    pos=({:7.3} {:7.3} {:7.3}) uv=({:.4} {:.4}) dir={:?} ao={} sky={} block={}",
                    d.pos.x, d.pos.y, d.pos.z, d.uv[0], d.uv[1], d.dir, d.ao, d.sky, d.block
                );
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let cfg = EngineConfig::load_or_default(&cli.config)?;
    let reg = BlockRegistry::load_from_path(&cli.blocks)?;
    log::info!("loaded {} block types from {}", reg.len(), cli.blocks.display());
    let base = cfg.mesh_settings(&reg)?;

    match cli.command {
        Command::Mesh {
            scene,
            toggles,
            repeat,
        } => run_mesh(Arc::new(reg), &cfg, apply_toggles(base, toggles), make_scene(scene)?, repeat),
        Command::Dump {
            scene,
            toggles,
            x,
            y,
            z,
            limit,
        } => run_dump(
            &reg,
            apply_toggles(base, toggles),
            make_scene(scene)?,
            SubchunkCoord::new(x, y, z),
            limit,
        ),
    }
}
