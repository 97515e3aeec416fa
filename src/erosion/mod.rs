//! Erosion simulation module
//!
//! Implements complementary erosion and hydrology passes over a square
//! row-major heightmap:
//! - **Hydraulic erosion**: Particle-based water droplet simulation for detail
//! - **Thermal erosion**: Talus-angle slope relaxation
//! - **Wind erosion**: Abrasion of windward faces with downwind deposition
//! - **Sediment transport**: Flow accumulation-based stream-bed smoothing
//! - **Drainage analysis**: D8 flow accumulation and Strahler stream networks
//!
//! Mutating passes work in place on the caller's buffer and return
//! [`ErosionStats`]; analysis passes return fresh buffers.

pub mod hydraulic;
pub mod params;
pub mod rivers;
pub mod sediment;
pub mod thermal;
pub mod utils;
pub mod wind;

pub use params::{
    DrainageParams, ErosionParams, ErosionPreset, HydraulicParams, SedimentParams, ThermalParams,
    WindParams,
};
pub use rivers::{summarize_network, DrainagePattern, NetworkSummary};

use crate::error::GridError;

/// Statistics from erosion simulation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionStats {
    /// Total material eroded (in height units)
    pub total_eroded: f64,
    /// Total material deposited
    pub total_deposited: f64,
    /// Material carried off the grid edge
    pub lost: f64,
    /// Total number of simulation steps taken (e.g., droplet steps)
    pub steps_taken: u64,
    /// Number of iterations/droplets processed
    pub iterations: usize,
    /// Maximum erosion in a single step
    pub max_erosion: f32,
    /// Maximum deposition in a single step
    pub max_deposition: f32,
}

impl ErosionStats {
    pub fn record_erosion(&mut self, amount: f32) {
        self.total_eroded += amount as f64;
        self.max_erosion = self.max_erosion.max(amount);
    }

    pub fn record_deposit(&mut self, amount: f32) {
        self.total_deposited += amount as f64;
        self.max_deposition = self.max_deposition.max(amount);
    }

    /// Net height change over the grid implied by these stats.
    pub fn net_change(&self) -> f64 {
        self.total_deposited - self.total_eroded
    }
}

/// One mutating erosion pass with its parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum ErosionPass {
    Hydraulic(HydraulicParams),
    Thermal(ThermalParams),
    Wind(WindParams),
    /// Computes flow accumulation on the current heights, then transports
    SedimentTransport(SedimentParams),
}

impl ErosionPass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hydraulic(_) => "hydraulic",
            Self::Thermal(_) => "thermal",
            Self::Wind(_) => "wind",
            Self::SedimentTransport(_) => "sediment transport",
        }
    }

    /// Run the pass on `heights`. `seed` only matters for hydraulic erosion.
    pub fn apply(
        &self,
        heights: &mut [f32],
        resolution: usize,
        tile_size: f32,
        seed: u64,
    ) -> Result<ErosionStats, GridError> {
        match self {
            Self::Hydraulic(params) => hydraulic::simulate(heights, resolution, tile_size, params, seed),
            Self::Thermal(params) => thermal::simulate(heights, resolution, tile_size, params),
            Self::Wind(params) => wind::simulate(heights, resolution, tile_size, params),
            Self::SedimentTransport(params) => {
                let flow_acc = rivers::compute_flow_accumulation(heights, resolution)?;
                sediment::simulate_transport(
                    heights,
                    resolution,
                    &flow_acc,
                    params.transport_capacity,
                    params.deposition_rate,
                )
            }
        }
    }
}

/// Everything produced by [`simulate_erosion`]. Disabled passes are `None`.
#[derive(Clone, Debug, Default)]
pub struct ErosionReport {
    pub hydraulic: Option<ErosionStats>,
    pub thermal: Option<ErosionStats>,
    pub wind: Option<ErosionStats>,
    pub sediment: Option<ErosionStats>,
    /// Flow accumulation of the heights entering sediment transport
    pub flow_accumulation: Vec<f32>,
    pub drainage: Vec<DrainagePattern>,
}

impl ErosionReport {
    /// Stats of every pass that ran, in pipeline order.
    pub fn passes(&self) -> impl Iterator<Item = (&'static str, &ErosionStats)> {
        [
            ("hydraulic", self.hydraulic.as_ref()),
            ("thermal", self.thermal.as_ref()),
            ("wind", self.wind.as_ref()),
            ("sediment transport", self.sediment.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, stats)| stats.map(|s| (name, s)))
    }
}

/// Run the full erosion pipeline:
/// hydraulic → thermal → wind → flow accumulation → sediment transport → drainage.
///
/// The grid is validated once up front, so an invalid buffer is rejected
/// before any pass touches it.
pub fn simulate_erosion(
    heights: &mut [f32],
    resolution: usize,
    tile_size: f32,
    params: &ErosionParams,
    seed: u64,
) -> Result<ErosionReport, GridError> {
    crate::grid::check_grid(heights.len(), resolution)?;
    crate::grid::check_tile_size(tile_size)?;

    let mut report = ErosionReport::default();

    let run = |pass: ErosionPass, heights: &mut [f32]| -> Result<ErosionStats, GridError> {
        log::info!("Running {} erosion...", pass.name());
        let stats = pass.apply(heights, resolution, tile_size, seed)?;
        log::info!(
            "  {}: eroded {:.2}, deposited {:.2}, lost {:.2}",
            pass.name(),
            stats.total_eroded,
            stats.total_deposited,
            stats.lost
        );
        Ok(stats)
    };

    if params.enable_hydraulic {
        report.hydraulic = Some(run(ErosionPass::Hydraulic(params.hydraulic.clone()), heights)?);
    }
    if params.enable_thermal {
        report.thermal = Some(run(ErosionPass::Thermal(params.thermal.clone()), heights)?);
    }
    if params.enable_wind {
        report.wind = Some(run(ErosionPass::Wind(params.wind.clone()), heights)?);
    }

    log::info!("Computing flow accumulation...");
    report.flow_accumulation = rivers::compute_flow_accumulation(heights, resolution)?;

    if params.enable_sediment_transport {
        log::info!("Running sediment transport...");
        let stats = sediment::simulate_transport(
            heights,
            resolution,
            &report.flow_accumulation,
            params.sediment.transport_capacity,
            params.sediment.deposition_rate,
        )?;
        log::info!("  sediment transport: moved {:.2}", stats.total_eroded);
        report.sediment = Some(stats);
    }

    if params.enable_drainage {
        log::info!("Extracting drainage patterns...");
        report.drainage =
            rivers::generate_drainage_patterns_with(heights, resolution, tile_size, &params.drainage)?;
        log::info!("  {} stream segments", report.drainage.len());
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{generate_terrain, TerrainParams};

    #[test]
    fn test_record_tracks_totals_and_maxima() {
        let mut stats = ErosionStats::default();
        stats.record_erosion(0.5);
        stats.record_erosion(1.5);
        stats.record_deposit(0.25);
        assert_eq!(stats.total_eroded, 2.0);
        assert_eq!(stats.max_erosion, 1.5);
        assert_eq!(stats.max_deposition, 0.25);
        assert_eq!(stats.net_change(), -1.75);
    }

    #[test]
    fn test_pass_apply_matches_direct_call() {
        let res = 16;
        let base = generate_terrain(res, 3, &TerrainParams::default());

        let mut via_pass = base.clone();
        let mut direct = base.clone();
        let params = HydraulicParams { iterations: 40, ..Default::default() };
        ErosionPass::Hydraulic(params.clone())
            .apply(&mut via_pass, res, 1.0, 9)
            .unwrap();
        hydraulic::simulate(&mut direct, res, 1.0, &params, 9).unwrap();
        assert_eq!(via_pass, direct);
    }

    #[test]
    fn test_pipeline_runs_enabled_passes() {
        let res = 24;
        let mut heights = generate_terrain(res, 42, &TerrainParams::default());
        let before = heights.clone();

        let report = simulate_erosion(&mut heights, res, 1.0, &ErosionParams::fast(), 42).unwrap();

        assert!(report.hydraulic.is_some());
        assert!(report.thermal.is_some());
        assert!(report.wind.is_some());
        assert!(report.sediment.is_some());
        assert_eq!(report.passes().count(), 4);
        assert_eq!(report.flow_accumulation.len(), res * res);
        assert_ne!(heights, before);
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let res = 16;
        let base = generate_terrain(res, 5, &TerrainParams::default());
        let mut a = base.clone();
        let mut b = base;
        simulate_erosion(&mut a, res, 2.0, &ErosionParams::fast(), 11).unwrap();
        simulate_erosion(&mut b, res, 2.0, &ErosionParams::fast(), 11).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_none_preset_only_analyses() {
        let res = 16;
        let mut heights = generate_terrain(res, 8, &TerrainParams::default());
        let before = heights.clone();
        let params = ErosionParams::from_preset(ErosionPreset::None);

        let report = simulate_erosion(&mut heights, res, 1.0, &params, 1).unwrap();
        assert_eq!(heights, before);
        assert_eq!(report.passes().count(), 0);
        assert_eq!(report.flow_accumulation.len(), res * res);
    }

    #[test]
    fn test_pipeline_rejects_bad_grid_untouched() {
        let mut heights = vec![1.0f32; 10];
        let result = simulate_erosion(&mut heights, 4, 1.0, &ErosionParams::default(), 0);
        assert!(result.is_err());
        assert!(heights.iter().all(|&h| h == 1.0));
    }
}
