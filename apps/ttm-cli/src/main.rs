use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Vector3;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use ttm_campaign::{
    Campaign, CampaignEvent, CampaignResult, CampaignState, ProbeTable, ProcessSolver,
};
use ttm_core::RegionName;
use ttm_results::Phase;

#[derive(Parser)]
#[command(name = "ttm")]
#[command(about = "Transport temperature model - battery cargo thermal campaigns", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a campaign and print its cargo regions
    Validate {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
    },
    /// Run (or resume) the transport phase
    Run {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
        /// Skip aggregating results afterwards
        #[arg(long)]
        no_postprocess: bool,
    },
    /// Run (or resume) the arrival phase after transport
    Arrival {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
        /// Skip aggregating results afterwards
        #[arg(long)]
        no_postprocess: bool,
    },
    /// Aggregate solver output into per-region tables
    Postprocess {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
        #[arg(long, value_enum, default_value_t = PhaseArg::Transport)]
        phase: PhaseArg,
    },
    /// Sample a region at the configured probe locations
    Probe {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
        /// Region to sample, e.g. battery0_3
        #[arg(value_parser = parse_region)]
        region: RegionName,
        /// Add a probe location (x y z in m) before sampling
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
        at: Option<Vec<f64>>,
        /// Output time in seconds; defaults to the latest
        #[arg(long)]
        time: Option<f64>,
    },
    /// Sample the centre of every freight element of a cargo region
    ProbeFreight {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
        #[arg(value_parser = parse_region)]
        region: RegionName,
        /// Output time in seconds; defaults to the latest
        #[arg(long)]
        time: Option<f64>,
    },
    /// Remove every configured probe location
    ClearProbes {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
    },
    /// Reconstruct the latest decomposed time
    Reconstruct {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
    },
    /// Set the number of CPU cores used by the solver
    Cpucores {
        /// Campaign directory holding campaign.yaml
        campaign: PathBuf,
        cores: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
    Transport,
    Arrival,
}

impl From<PhaseArg> for Phase {
    fn from(phase: PhaseArg) -> Self {
        match phase {
            PhaseArg::Transport => Phase::Transport,
            PhaseArg::Arrival => Phase::Arrival,
        }
    }
}

fn parse_region(s: &str) -> Result<RegionName, String> {
    RegionName::parse(s).map_err(|e| e.to_string())
}

fn main() -> CampaignResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { campaign } => cmd_validate(&campaign),
        Commands::Run {
            campaign,
            no_postprocess,
        } => cmd_run(&campaign, !no_postprocess),
        Commands::Arrival {
            campaign,
            no_postprocess,
        } => cmd_arrival(&campaign, !no_postprocess),
        Commands::Postprocess { campaign, phase } => cmd_postprocess(&campaign, phase.into()),
        Commands::Probe {
            campaign,
            region,
            at,
            time,
        } => {
            let location = at.map(|p| Vector3::new(p[0], p[1], p[2]));
            cmd_probe(&campaign, &region, location, time)
        }
        Commands::ProbeFreight {
            campaign,
            region,
            time,
        } => cmd_probe_freight(&campaign, &region, time),
        Commands::ClearProbes { campaign } => {
            Campaign::open(&campaign)?.clear_probes()?;
            println!("✓ Probe locations cleared");
            Ok(())
        }
        Commands::Reconstruct { campaign } => cmd_reconstruct(&campaign),
        Commands::Cpucores { campaign, cores } => {
            Campaign::open(&campaign)?.set_cpu_cores(cores)?;
            println!("✓ Solver set to {cores} cores");
            Ok(())
        }
    }
}

fn solver_for(campaign: &Campaign) -> ProcessSolver {
    let def = campaign.definition();
    ProcessSolver::new(def.solver.cpu_cores.unwrap_or(1), def.solver.solver_log.clone())
}

fn cmd_validate(path: &Path) -> CampaignResult<()> {
    println!("Validating campaign: {}", path.display());
    let campaign = Campaign::open(path)?;
    let def = campaign.definition();
    let layouts = def.layouts()?;
    println!("✓ Campaign '{}' is valid", def.name);
    println!("  Carrier: {:?}", def.carrier);
    for layout in &layouts {
        for region in &layout.regions {
            println!(
                "  {}  {:.3} x {:.3} x {:.3} m",
                region.name,
                region.dimensions_m.x,
                region.dimensions_m.y,
                region.dimensions_m.z
            );
        }
    }
    Ok(())
}

fn cmd_run(path: &Path, aggregate: bool) -> CampaignResult<()> {
    let mut campaign = Campaign::open(path)?;
    println!("Running transport for campaign: {}", campaign.definition().name);
    let mut solver = solver_for(&campaign);
    let mut weather = campaign.weather_source();

    let started = Instant::now();
    let summary = campaign.run_transport(
        &mut solver,
        &mut weather,
        Some(&mut |event| render_cli_progress(&event, started)),
    )?;
    clear_progress_line();

    if summary.boundaries.is_empty() {
        println!("✓ Transport already complete at t={:.0} s", summary.resumed_from_s);
    } else {
        println!(
            "✓ Transport complete: {} segments from t={:.0} s to t={:.0} s",
            summary.boundaries.len(),
            summary.resumed_from_s,
            summary.duration_s
        );
    }
    for b in &summary.boundaries {
        println!(
            "  segment {:>3}  T_a={:.2} K  v={:.2} m/s  h={:.3} W/m²K ({:?})",
            b.segment_index,
            b.ambient_k,
            b.speed_mps,
            b.coefficient.value_w_per_m2k,
            b.coefficient.regime
        );
    }

    if aggregate {
        cmd_postprocess(path, Phase::Transport)?;
    }
    Ok(())
}

fn cmd_arrival(path: &Path, aggregate: bool) -> CampaignResult<()> {
    let mut campaign = Campaign::open(path)?;
    println!("Running arrival for campaign: {}", campaign.definition().name);
    let mut solver = solver_for(&campaign);
    let mut weather = campaign.weather_source();

    let started = Instant::now();
    let summary = campaign.run_arrival(
        &mut solver,
        &mut weather,
        Some(&mut |event| render_cli_progress(&event, started)),
    )?;
    clear_progress_line();

    if summary.converged {
        println!(
            "✓ Cargo within {:.3} K of {:.2} K after {} new chunks",
            summary.deviation_k, summary.ambient_k, summary.chunks_run
        );
    } else {
        println!(
            "! Chunk limit reached, cargo still {:.3} K from {:.2} K",
            summary.deviation_k, summary.ambient_k
        );
    }

    if aggregate {
        cmd_postprocess(path, Phase::Arrival)?;
    }
    Ok(())
}

fn cmd_postprocess(path: &Path, phase: Phase) -> CampaignResult<()> {
    let campaign = Campaign::open(path)?;
    let mut weather = campaign.weather_source();
    let summary = campaign.postprocess(&mut weather, phase)?;
    println!("✓ Aggregated {:?} phase", phase);
    for series in &summary.regions {
        println!("  {}: {} rows", series.name, series.rows.len());
    }
    if let Some(cargo) = &summary.cargo {
        println!("  {}: {} rows", cargo.name, cargo.rows.len());
    }
    if !summary.wall_heat_flux_patches.is_empty() {
        println!("  Wall heat flux: {}", summary.wall_heat_flux_patches.join(", "));
    }
    Ok(())
}

fn cmd_probe(
    path: &Path,
    region: &RegionName,
    location: Option<Vector3<f64>>,
    time_s: Option<f64>,
) -> CampaignResult<()> {
    let mut campaign = Campaign::open(path)?;
    let mut solver = solver_for(&campaign);
    let table = campaign.probe(&mut solver, region, location, time_s)?;
    print_probe_table(&table);
    Ok(())
}

fn cmd_probe_freight(path: &Path, region: &RegionName, time_s: Option<f64>) -> CampaignResult<()> {
    let mut campaign = Campaign::open(path)?;
    let mut solver = solver_for(&campaign);
    let table = campaign.probe_freight(&mut solver, region, time_s)?;
    print_probe_table(&table);
    Ok(())
}

fn cmd_reconstruct(path: &Path) -> CampaignResult<()> {
    let mut campaign = Campaign::open(path)?;
    let mut solver = solver_for(&campaign);
    if campaign.reconstruct(&mut solver)? {
        println!("✓ Latest time reconstructed");
    } else {
        println!("Nothing to reconstruct");
    }
    Ok(())
}

fn print_probe_table(table: &ProbeTable) {
    println!(
        "✓ Probed {} at t={} ({} locations) -> {}",
        table.region,
        table.time,
        table.locations.len(),
        table.path.display()
    );
    for (t, values) in &table.rows {
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
        println!("  t={t:.0} s  min={min:.2} °C  max={max:.2} °C");
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &CampaignEvent, started: Instant) {
    let label = match event.state {
        CampaignState::Unbuilt => "building mesh".to_string(),
        CampaignState::MeshBuilt => "mesh ready".to_string(),
        CampaignState::Running(i) => format!("segment {i}"),
        CampaignState::SegmentComplete(i) => format!("segment {i} done"),
        CampaignState::TransportComplete => "transport complete".to_string(),
        CampaignState::ArrivalRunning(k) => format!("arrival chunk {k}"),
        CampaignState::ArrivalComplete => "arrival complete".to_string(),
    };
    let mut line = format!(
        "\r{label}  t={:.0}s  elapsed={:.1}s",
        event.sim_time_s,
        started.elapsed().as_secs_f64()
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line}");
    let _ = io::stdout().flush();
}
