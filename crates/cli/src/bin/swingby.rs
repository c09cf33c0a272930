use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use swingby_config::{builtin_bodies, load_bodies, load_mission};
use swingby_core::time::seconds_to_days;
use swingby_core::vector;
use swingby_dynamics::BodyTable;
use swingby_ephem::{EphemerisProvider, KeplerianEphemeris};
use swingby_export::summary::{MissionSummary, write_json};
use swingby_export::{trajectory, writer_for_path};
use swingby_mission::{MissionOutcome, MissionPlan, MissionReport, run_mission};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "N-body swingby trajectory propagator"
)]
struct Cli {
    /// Mission description (TOML or YAML)
    #[arg(long)]
    mission: PathBuf,

    /// Body catalog directory or file (defaults to the built-in solar system table)
    #[arg(long)]
    bodies: Option<PathBuf>,

    /// Planet ephemeris source
    #[arg(long, value_enum, default_value_t = EphemerisMode::Approximate)]
    ephemeris: EphemerisMode,

    /// Write the sampled trajectory as CSV (`-` for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write a JSON mission summary (`-` for stdout)
    #[arg(long)]
    json: Option<PathBuf>,

    /// Only validate the mission file, do not propagate
    #[arg(long, default_value_t = false)]
    check: bool,
}

#[derive(Copy, Clone, ValueEnum, Debug)]
enum EphemerisMode {
    /// Secular mean elements (1800-2050)
    Approximate,
    /// Frozen J2000 elements on pure Keplerian orbits
    TwoBody,
    /// JPL kernels through CSPICE (requires the `spice` feature)
    Spice,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let configs = match &cli.bodies {
        Some(path) => load_bodies(path)
            .with_context(|| format!("loading bodies from {}", path.display()))?,
        None => builtin_bodies(),
    };
    let bodies = BodyTable::from_configs(&configs)?;

    let file = load_mission(&cli.mission)
        .with_context(|| format!("loading mission {}", cli.mission.display()))?;
    let plan = MissionPlan::from_file(&file)?;
    plan.validate(&bodies)?;
    info!(
        "mission '{}' with {} segment(s), {:.1} days planned",
        plan.name,
        plan.segments.len(),
        seconds_to_days(plan.total_duration_s())
    );

    if cli.check {
        println!("Mission '{}' is valid.", plan.name);
        return Ok(());
    }

    let ephemeris = build_ephemeris(cli.ephemeris, bodies.central().mu_km3_s2)?;
    let report = match run_mission(&plan, &bodies, ephemeris.as_ref()) {
        Ok(report) => report,
        Err(failure) => {
            for record in &failure.completed {
                warn!(
                    "segment {} completed before failure ({} samples)",
                    record.index,
                    record.solution.samples.len()
                );
            }
            return Err(failure.into());
        }
    };

    print_report(&report);

    if let Some(path) = &cli.csv {
        write_csv(&report, path)?;
    }
    if let Some(path) = &cli.json {
        let summary = MissionSummary::from_report(&report);
        let writer = writer_for_path(path)?;
        write_json(&summary, writer)?;
        if path != Path::new("-") {
            info!("summary written to {}", path.display());
        }
    }

    Ok(())
}

fn build_ephemeris(
    mode: EphemerisMode,
    mu_sun: f64,
) -> anyhow::Result<Box<dyn EphemerisProvider>> {
    match mode {
        EphemerisMode::Approximate => Ok(Box::new(KeplerianEphemeris::approximate(mu_sun))),
        EphemerisMode::TwoBody => Ok(Box::new(KeplerianEphemeris::two_body(mu_sun))),
        EphemerisMode::Spice => spice_ephemeris(),
    }
}

#[cfg(feature = "spice")]
fn spice_ephemeris() -> anyhow::Result<Box<dyn EphemerisProvider>> {
    Ok(Box::new(swingby_ephem::spice::SpiceEphemeris::new()?))
}

#[cfg(not(feature = "spice"))]
fn spice_ephemeris() -> anyhow::Result<Box<dyn EphemerisProvider>> {
    anyhow::bail!("this build has no SPICE support; rebuild with `--features spice`")
}

fn write_csv(report: &MissionReport, path: &Path) -> anyhow::Result<()> {
    let writer = writer_for_path(path)?;
    trajectory::write_csv(report, writer)?;
    if path != Path::new("-") {
        info!("trajectory written to {}", path.display());
    }
    Ok(())
}

fn print_report(report: &MissionReport) {
    let start = report.trajectory.first().map(|p| p.epoch);
    let end = report.trajectory.last().map(|p| p.epoch);
    let flown = match (start, end) {
        (Some(start), Some(end)) => end - start,
        _ => 0.0,
    };
    let (d, h, m) = format_duration(flown);

    println!("=== Mission Profile ===");
    println!("Mission         : {}", report.name);
    println!("Ephemeris       : {}", report.ephemeris);
    if let (Some(start), Some(end)) = (start, end) {
        println!("Start epoch     : {start}");
        println!("End epoch       : {end}");
    }
    println!("Flight time     : {:.2} days ({d}d {h}h {m}m)", seconds_to_days(flown));

    for record in &report.segments {
        let stats = record.solution.stats;
        println!(
            "Segment {:<7} : {:.2} days, Δv = {:.6} km/s, steps = {} ({} rejected)",
            record.index,
            seconds_to_days(record.end() - record.start),
            vector::norm(&record.delta_v_km_s),
            stats.accepted_steps,
            stats.rejected_steps
        );
        if !record.excluded.is_empty() {
            let names: Vec<&str> = record.excluded.iter().map(|b| b.name()).collect();
            println!("                  excluded at start: {}", names.join(", "));
        }
    }

    if let Some(closest) = swingby_mission::closest_approach(&report.distances) {
        println!(
            "Closest {:<7} : {:.1} km at {}",
            report.distance_reference.name(),
            closest.distance_km,
            closest.epoch
        );
    }

    match &report.outcome {
        MissionOutcome::Complete => println!("Outcome         : complete"),
        MissionOutcome::TerminatedByImpact(event) => println!(
            "Outcome         : impact with {} at {} (segment elapsed {:.3} days)",
            event.body.name(),
            event.epoch,
            seconds_to_days(event.elapsed_s)
        ),
    }
}

fn format_duration(seconds: f64) -> (i64, i64, i64) {
    let total_seconds = seconds.max(0.0);
    let days = (total_seconds / 86_400.0).floor() as i64;
    let remaining = total_seconds - (days as f64 * 86_400.0);
    let hours = (remaining / 3_600.0).floor() as i64;
    let minutes = ((remaining - hours as f64 * 3_600.0) / 60.0).floor() as i64;
    (days, hours, minutes)
}
