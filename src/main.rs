use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use terrain_erosion::erosion::{self, summarize_network, ErosionParams, ErosionPreset};
use terrain_erosion::terrain::{generate_terrain, TerrainParams};

#[derive(Parser, Debug)]
#[command(name = "terrain_erosion")]
#[command(about = "Erode a procedural heightmap and analyse its drainage network")]
struct Args {
    /// Cells per side of the square heightmap
    #[arg(short, long, default_value = "256")]
    resolution: usize,

    /// World-space size of one cell
    #[arg(short, long, default_value = "1.0")]
    tile_size: f32,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Erosion preset: none, minimal, normal, dramatic, realistic
    #[arg(short, long, default_value = "normal")]
    preset: ErosionPreset,

    /// JSON parameter file (overrides --preset; missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective parameters as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Drop streams shorter than this (world units)
    #[arg(long)]
    min_stream_length: Option<f32>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut params = match &args.config {
        Some(path) => ErosionParams::load(path)?,
        None => ErosionParams::from_preset(args.preset),
    };
    if let Some(min_len) = args.min_stream_length {
        params.drainage.min_stream_length = min_len;
    }

    if args.dump_config {
        println!("{}", params.to_json_pretty()?);
        return Ok(());
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    println!("Eroding terrain with seed: {}", seed);
    println!(
        "Map size: {}x{} cells, tile size {}",
        args.resolution, args.resolution, args.tile_size
    );
    if args.config.is_none() {
        println!("Preset: {} ({})", args.preset, args.preset.description());
    }

    let mut heights = generate_terrain(args.resolution, seed, &TerrainParams::default());
    let (min_before, max_before) = height_range(&heights);
    println!("Heightmap range: {:.1} to {:.1}", min_before, max_before);

    let report = erosion::simulate_erosion(&mut heights, args.resolution, args.tile_size, &params, seed)?;

    println!("\n=== Erosion ===");
    for (name, stats) in report.passes() {
        println!(
            "{:<20} eroded {:>10.2}  deposited {:>10.2}  lost {:>8.2}  max cut {:.3}",
            name, stats.total_eroded, stats.total_deposited, stats.lost, stats.max_erosion
        );
    }
    let (min_after, max_after) = height_range(&heights);
    println!("Heightmap range: {:.1} to {:.1}", min_after, max_after);

    let max_acc = report.flow_accumulation.iter().cloned().fold(0.0f32, f32::max);
    println!("\n=== Drainage ===");
    println!("Max flow accumulation: {:.0} cells", max_acc);

    if params.enable_drainage {
        let summary = summarize_network(&report.drainage);
        println!("Stream segments: {}", report.drainage.len());
        for (k, (count, avg)) in summary
            .streams_by_order
            .iter()
            .zip(&summary.avg_length_by_order)
            .enumerate()
        {
            println!("  Order {}: {} streams, mean length {:.1}", k + 1, count, avg);
        }
        println!("Total stream length: {:.1}", summary.total_length);
        println!("Bifurcation ratio: {:.2}", summary.bifurcation_ratio);
    }

    Ok(())
}

fn height_range(heights: &[f32]) -> (f32, f32) {
    heights
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
}
