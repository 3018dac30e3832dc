use anyhow::Context;
use clap::Parser;
use generator::profile::build_transect;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline boat-velocity processing driver")]
struct Args {
    /// Run one synthetic transect and emit a baseline summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 600)]
    ensembles: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Borrow from alternate sources where the reference is invalid
    #[arg(long, default_value_t = false)]
    composite: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.ensembles, args.seed, args.composite)
    };

    let runner = Runner::new(workflow_config.clone());
    let transect = build_transect(&workflow_config.to_generator_config())
        .context("building synthetic transect")?;

    if args.offline {
        let result = runner.execute(&transect)?;

        println!(
            "Offline run -> ensembles {}, invalid {}, distance {:.1} m, dmg {:.1} m",
            result.ensembles,
            result.invalid_count,
            result.distance_m(),
            result.dmg_m()
        );
        for (label, count) in &result.provenance_counts {
            println!("  {label}: {count}");
        }

        let report = format!(
            "ensembles={} invalid={} distance_m={:.2} dmg_m={:.2} provenance={:?}\n",
            result.ensembles,
            result.invalid_count,
            result.distance_m(),
            result.dmg_m(),
            result.provenance_counts
        );
        let report_path = PathBuf::from("tools/data/offline_transect.log");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)?;
        file.write_all(report.as_bytes())?;
    }

    Ok(())
}
