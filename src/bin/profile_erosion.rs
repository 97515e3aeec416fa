//! Profiling tool to identify performance bottlenecks

use std::process::ExitCode;
use std::time::{Duration, Instant};

use terrain_erosion::erosion::{rivers, ErosionParams, ErosionPass};
use terrain_erosion::terrain::{generate_terrain, TerrainParams};
use terrain_erosion::GridError;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match profile() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn profile() -> Result<(), GridError> {
    let resolution = 512;
    let tile_size = 1.0;
    let seed = 1337u64;

    println!("=== Performance Profiling ===");
    println!("Map size: {}x{} ({} cells)", resolution, resolution, resolution * resolution);
    println!();

    let start = Instant::now();
    let mut heights = generate_terrain(resolution, seed, &TerrainParams::default());
    let terrain_time = start.elapsed();
    println!("Terrain generation: {:?}", terrain_time);

    let params = ErosionParams::default();
    println!("\nErosion parameters:");
    println!("  Hydraulic droplets: {}", params.hydraulic.iterations);
    println!("  Thermal sweeps: {}", params.thermal.iterations);
    println!("  Wind passes: {}", params.wind.iterations);
    println!();

    let passes = [
        ErosionPass::Hydraulic(params.hydraulic.clone()),
        ErosionPass::Thermal(params.thermal.clone()),
        ErosionPass::Wind(params.wind.clone()),
        ErosionPass::SedimentTransport(params.sediment.clone()),
    ];

    let mut timings: Vec<(&str, Duration)> = vec![("terrain", terrain_time)];
    for pass in &passes {
        let start = Instant::now();
        let stats = pass.apply(&mut heights, resolution, tile_size, seed)?;
        let elapsed = start.elapsed();
        println!("{}: {:?}", pass.name(), elapsed);
        println!("  Eroded: {:.0} units", stats.total_eroded);
        println!("  Deposited: {:.0} units", stats.total_deposited);
        timings.push((pass.name(), elapsed));
    }

    let start = Instant::now();
    let flow_acc = rivers::compute_flow_accumulation(&heights, resolution)?;
    let flow_time = start.elapsed();
    println!("Flow accumulation: {:?}", flow_time);
    timings.push(("flow accumulation", flow_time));

    let start = Instant::now();
    let patterns = rivers::generate_drainage_patterns(&heights, resolution, tile_size, 0.0)?;
    let drainage_time = start.elapsed();
    println!("Drainage patterns: {:?} ({} streams)", drainage_time, patterns.len());
    timings.push(("drainage", drainage_time));

    let start = Instant::now();
    let filled = rivers::compute_flow_accumulation_filled(&heights, resolution)?;
    let filled_time = start.elapsed();
    let max_acc = flow_acc.iter().chain(&filled).cloned().fold(0.0f32, f32::max);
    println!("Filled flow accumulation: {:?} (max {:.0})", filled_time, max_acc);
    timings.push(("filled accumulation", filled_time));

    // Summary
    let total: Duration = timings.iter().map(|(_, t)| *t).sum();
    println!("\n=== Summary ===");
    for (name, time) in &timings {
        println!(
            "{:<20} {:>8.2}% ({:?})",
            name,
            100.0 * time.as_secs_f64() / total.as_secs_f64().max(f64::EPSILON),
            time
        );
    }
    println!("─────────────────────────────────");
    println!("TOTAL:               {:>8}  {:?}", "100%", total);

    Ok(())
}
