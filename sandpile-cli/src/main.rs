mod fill;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use fill::{FillKind, fill_center_block, random_fill, random_fill_mass};
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sandpile_core::{Boundary, Lattice, LatticeConfig, LimitCycle};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Perturb every cell of relaxed random lattices and record the cascades
    Cascades(CascadesArgs),
    /// Measure limit-cycle periods of periodic lattices for a set of masses
    LimitCycles(LimitCyclesArgs),
    /// Relax a heavy centered block and dump the final heights
    Fractal(FractalArgs),
    /// Relax one random lattice and report how long it took
    Relax(RelaxArgs),
}

#[derive(Args, Debug, Serialize)]
struct CascadesArgs {
    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Lattice side length L (LxL)
    #[arg(long, default_value_t = 20)]
    size: usize,

    /// Toppling threshold
    #[arg(long, default_value_t = 4)]
    threshold: i64,

    /// Use periodic instead of fixed boundaries
    #[arg(long)]
    periodic: bool,

    /// Number of random lattices
    #[arg(long, default_value_t = 2500)]
    sims: usize,

    /// Grains added to the perturbed cell
    #[arg(long, default_value_t = 5)]
    perturbation: i64,

    /// Step budget of each cascade
    #[arg(long, default_value_t = 10_000)]
    max_time: u64,

    /// Step budget of the initial relaxation
    #[arg(long, default_value_t = 100_000)]
    relax_steps: u64,

    /// Steps between stability checks during the initial relaxation
    #[arg(long, default_value_t = 100)]
    relax_chunk: u64,

    /// Base RNG seed (reproducibility)
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

#[derive(Args, Debug, Serialize)]
struct LimitCyclesArgs {
    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Lattice side length L (LxL), always periodic
    #[arg(long, default_value_t = 20)]
    size: usize,

    /// Toppling threshold
    #[arg(long, default_value_t = 4)]
    threshold: i64,

    /// Comma-separated total masses, e.g. "50,70"
    #[arg(long, default_value = "50,70")]
    masses: String,

    /// Random lattices per mass
    #[arg(long, default_value_t = 100)]
    sims_per_mass: usize,

    /// Steps searched for a repeated configuration
    #[arg(long, default_value_t = 500)]
    max_time: u64,

    /// Base RNG seed (reproducibility)
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

#[derive(Args, Debug, Serialize)]
struct FractalArgs {
    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Lattice side length L (LxL)
    #[arg(long, default_value_t = 50)]
    size: usize,

    /// Toppling threshold
    #[arg(long, default_value_t = 4)]
    threshold: i64,

    /// Height of each cell of the centered block
    #[arg(long, default_value_t = 100_000)]
    mass: i64,

    /// Side of the centered block
    #[arg(long, default_value_t = 2)]
    block: usize,

    /// Steps between stability checks
    #[arg(long, default_value_t = 100)]
    relax_chunk: u64,
}

#[derive(Args, Debug, Serialize)]
struct RelaxArgs {
    /// Lattice side length L (LxL)
    #[arg(long, default_value_t = 50)]
    size: usize,

    /// Toppling threshold
    #[arg(long, default_value_t = 4)]
    threshold: i64,

    /// Use periodic instead of fixed boundaries
    #[arg(long)]
    periodic: bool,

    /// Step budget
    #[arg(long, default_value_t = 100_000)]
    max_time: u64,

    /// Base RNG seed (reproducibility)
    #[arg(long, default_value_t = 123)]
    seed: u64,
}

#[derive(Serialize)]
struct RunMeta<'a, P: Serialize> {
    command: &'a str,
    fill: &'a str,
    lattice: LatticeConfig,
    params: &'a P,
}

#[derive(Serialize)]
struct CascadeRow {
    sim_idx: usize,
    cell_idx: usize,
    row: usize,
    col: usize,
    duration: i64,
    size: usize,
}

#[derive(Serialize)]
struct CycleRow {
    mass: u64,
    sim_idx: usize,
    period: i64,
    relax_time: i64,
}

#[derive(Serialize)]
struct FractalSummary {
    stable: bool,
    steps: u64,
    final_mass: i64,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Cascades(args) => run_cascades(&args),
        Command::LimitCycles(args) => run_limit_cycles(&args),
        Command::Fractal(args) => run_fractal(&args),
        Command::Relax(args) => run_relax(&args),
    }
}

fn boundary(periodic: bool) -> Boundary {
    if periodic {
        Boundary::Periodic
    } else {
        Boundary::Fixed
    }
}

// Deterministic per-simulation seed (stable across reruns and partial ranges)
fn sim_seed(base: u64, idx: u64) -> u64 {
    base ^ idx.wrapping_mul(0x9E3779B97F4A7C15)
}

fn run_cascades(args: &CascadesArgs) -> anyhow::Result<()> {
    let config = LatticeConfig::new(args.size, args.size)
        .with_boundary(boundary(args.periodic))
        .with_threshold(args.threshold);
    let mut latt = config.build().context("invalid lattice configuration")?;

    fs::create_dir_all(&args.out)?;
    write_meta(&args.out, "cascades", FillKind::Uniform, config, args)?;
    let mut rows = BufWriter::new(File::create(args.out.join("cascades.jsonl"))?);

    let t = args.threshold;
    let mut unrelaxed = 0usize;
    let mut measured = 0usize;

    for sim_idx in 0..args.sims {
        info!("Iteration: {}/{}", sim_idx, args.sims.saturating_sub(1));
        let mut rng = ChaCha8Rng::seed_from_u64(sim_seed(args.seed, sim_idx as u64));

        // Heights in [t, 5t) and let it settle into a critical configuration
        random_fill(&mut rng, &mut latt, t, 5 * t)?;
        let relaxation = latt.relax_in_chunks(args.relax_steps, args.relax_chunk);
        if !relaxation.is_stable() {
            warn!(
                "simulation {sim_idx} did not relax within {} steps, measuring anyway",
                args.relax_steps
            );
        }
        let relaxed = latt.snapshot();

        for cell_idx in 0..latt.len() {
            let (row, col) = latt.cell(cell_idx);
            latt.restore(&relaxed)?;
            latt.add(row, col, args.perturbation)?;
            let rec = latt.measure_cascade(args.max_time);

            if !rec.is_relaxed() {
                unrelaxed += 1;
            }
            measured += 1;

            let line = CascadeRow {
                sim_idx,
                cell_idx,
                row,
                col,
                duration: rec.duration,
                size: rec.size,
            };
            serde_json::to_writer(&mut rows, &line)?;
            rows.write_all(b"\n")?;
        }
    }

    rows.flush()?;

    println!("Wrote cascades to: {}", args.out.display());
    println!(
        "Cascades: {} (sims={} * cells={}), unrelaxed: {}",
        measured,
        args.sims,
        latt.len(),
        unrelaxed
    );

    Ok(())
}

fn run_limit_cycles(args: &LimitCyclesArgs) -> anyhow::Result<()> {
    let masses = parse_mass_set(&args.masses)?;
    if masses.is_empty() {
        bail!("masses parsed to empty set");
    }

    let config = LatticeConfig::new(args.size, args.size)
        .with_boundary(Boundary::Periodic)
        .with_threshold(args.threshold);
    let mut latt = config.build().context("invalid lattice configuration")?;

    fs::create_dir_all(&args.out)?;
    write_meta(&args.out, "limit-cycles", FillKind::Mass, config, args)?;
    let mut rows = BufWriter::new(File::create(args.out.join("limit_cycles.jsonl"))?);

    let mut global_idx: u64 = 0;
    for (m_idx, &mass) in masses.iter().enumerate() {
        info!("Mass: {} ({}/{})", mass, m_idx, masses.len());
        let mut found = 0usize;

        for sim_idx in 0..args.sims_per_mass {
            let mut rng = ChaCha8Rng::seed_from_u64(sim_seed(args.seed, global_idx));
            global_idx += 1;

            random_fill_mass(&mut rng, &mut latt, mass)?;
            let cycle = latt.find_limit_cycle(args.max_time);
            if matches!(cycle, LimitCycle::Found { .. }) {
                found += 1;
            }

            let line = CycleRow {
                mass,
                sim_idx,
                period: cycle.period().map_or(-1, |p| p as i64),
                relax_time: cycle.relax_time().map_or(-1, |t| t as i64),
            };
            serde_json::to_writer(&mut rows, &line)?;
            rows.write_all(b"\n")?;
        }

        info!("mass {mass}: {found}/{} cycles found", args.sims_per_mass);
    }

    rows.flush()?;

    println!("Wrote limit cycles to: {}", args.out.display());
    println!(
        "Samples: {} (masses={} * sims_per_mass={})",
        global_idx,
        masses.len(),
        args.sims_per_mass
    );

    Ok(())
}

fn run_fractal(args: &FractalArgs) -> anyhow::Result<()> {
    let config = LatticeConfig::new(args.size, args.size).with_threshold(args.threshold);
    let mut latt = config.build().context("invalid lattice configuration")?;
    fill_center_block(&mut latt, args.block, args.mass)?;

    let max_time = 10 * args.mass.max(0) as u64;
    let relaxation = latt.relax_in_chunks(max_time, args.relax_chunk);
    info!("fractal relaxation: {relaxation:?}");

    fs::create_dir_all(&args.out)?;
    write_meta(&args.out, "fractal", FillKind::CenterBlock, config, args)?;

    let mut heights = BufWriter::new(File::create(args.out.join("heights.bin"))?);
    write_i64_vec(&mut heights, latt.heights())?;
    heights.flush()?;

    let summary = FractalSummary {
        stable: relaxation.is_stable(),
        steps: relaxation.steps(),
        final_mass: latt.mass(),
    };
    let mut summary_file = BufWriter::new(File::create(args.out.join("summary.json"))?);
    serde_json::to_writer_pretty(&mut summary_file, &summary)?;
    summary_file.flush()?;

    println!("Wrote heights to: {}", args.out.display());
    println!(
        "Relaxed: {} after {} steps, mass {}",
        summary.stable, summary.steps, summary.final_mass
    );

    Ok(())
}

fn run_relax(args: &RelaxArgs) -> anyhow::Result<()> {
    let mut latt = Lattice::new(
        args.size,
        args.size,
        boundary(args.periodic),
        args.threshold,
    )
    .context("invalid lattice configuration")?;

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let t = args.threshold;
    random_fill(&mut rng, &mut latt, t, 5 * t)?;
    let initial_mass = latt.mass();

    let relaxation = latt.relax(args.max_time);
    info!("relaxation: {relaxation:?}");

    println!(
        "Relaxed: {} after {} steps, mass {} -> {}",
        relaxation.is_stable(),
        relaxation.steps(),
        initial_mass,
        latt.mass()
    );

    Ok(())
}

fn write_meta<P: Serialize>(
    out: &Path,
    command: &str,
    fill: FillKind,
    lattice: LatticeConfig,
    params: &P,
) -> anyhow::Result<()> {
    let meta = RunMeta {
        command,
        fill: fill.as_str(),
        lattice,
        params,
    };
    let mut f = BufWriter::new(File::create(out.join("meta.json"))?);
    serde_json::to_writer_pretty(&mut f, &meta)?;
    f.flush()?;
    Ok(())
}

fn write_i64_vec<W: Write>(w: &mut W, v: &[i64]) -> std::io::Result<()> {
    for &x in v {
        w.write_all(&x.to_le_bytes())?;
    }
    Ok(())
}

fn parse_mass_set(s: &str) -> anyhow::Result<Vec<u64>> {
    let mut out = Vec::new();
    for part in s.split(',') {
        let p = part.trim();
        if p.is_empty() {
            continue;
        }
        let v: u64 = p
            .parse()
            .with_context(|| format!("invalid mass {p:?}"))?;
        out.push(v);
    }
    // remove duplicates
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_set_is_sorted_and_deduplicated() {
        assert_eq!(parse_mass_set("70, 50,,70").unwrap(), vec![50, 70]);
        assert!(parse_mass_set("").unwrap().is_empty());
    }

    #[test]
    fn mass_set_rejects_garbage() {
        assert!(parse_mass_set("50,abc").is_err());
        assert!(parse_mass_set("-3").is_err());
    }

    #[test]
    fn sim_seeds_differ() {
        assert_eq!(sim_seed(123, 0), 123);
        assert_ne!(sim_seed(123, 1), sim_seed(123, 2));
    }

    #[test]
    fn i64_dump_is_little_endian() {
        let mut buf = Vec::new();
        write_i64_vec(&mut buf, &[1, -1]).unwrap();
        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..8], &1i64.to_le_bytes());
        assert_eq!(&buf[8..], &(-1i64).to_le_bytes());
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "sandpile-cli",
            "cascades",
            "--out",
            "/tmp/x",
            "--size",
            "8",
            "--periodic",
        ])
        .unwrap();
        match cli.command {
            Command::Cascades(args) => {
                assert_eq!(args.size, 8);
                assert!(args.periodic);
                assert_eq!(args.perturbation, 5);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
