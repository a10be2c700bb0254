//! Sweepgrid CLI
//!
//! Drives a ComfyUI-style generation server through a parameter sweep:
//! - per-axis value files under `<basepath>/params` (`--s 31-steps.txt` ...)
//! - full cartesian enumeration with deterministic output naming
//! - cleanup of stray output files plus resume over existing ones
//! - one blocking POST per missing combination, in enumeration order
//!
//! Axes `s` and `t` are required; output lands under
//! `<basepath>/params/images/<save-target subfolder>`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use sweepgrid_core::{
    dispatch::run_sweep, reconcile, AxisId, AxisSet, AxisSpec, SaveTarget, ValueKind,
};

mod client;
mod workflow;

const DEFAULT_WORKFLOW_FILE: &str = "simple_image1_API.json";

#[derive(Parser)]
#[command(name = "sweepgrid")]
#[command(
    author,
    version,
    about = "7-axis parameter sweeper for a ComfyUI-style generation server"
)]
struct Cli {
    /// Project base folder; must contain a 'params' subfolder.
    #[arg(long, default_value = ".")]
    basepath: PathBuf,

    /// Path to API-format workflow JSON (default: <basepath>/simple_image1_API.json).
    #[arg(long)]
    workflow_api: Option<PathBuf>,

    /// Generation server base URL.
    #[arg(long, default_value = "http://127.0.0.1:8188")]
    server: String,

    /// Optional client id (default: random UUID4).
    #[arg(long)]
    client_id: Option<String>,

    /// Axis s value file under <basepath>/params (e.g. '31-steps.txt'). Required.
    #[arg(long)]
    s: Option<String>,

    /// Axis t value file under <basepath>/params. Required.
    #[arg(long)]
    t: Option<String>,

    /// Axis u value file under <basepath>/params.
    #[arg(long)]
    u: Option<String>,

    /// Axis v value file under <basepath>/params.
    #[arg(long)]
    v: Option<String>,

    /// Axis x value file under <basepath>/params.
    #[arg(long)]
    x: Option<String>,

    /// Axis y value file under <basepath>/params.
    #[arg(long)]
    y: Option<String>,

    /// Axis z value file under <basepath>/params.
    #[arg(long)]
    z: Option<String>,

    /// Type for the next provided axis in order (s,t,u,v,x,y,z). Repeat per
    /// axis; one of auto|int|float|string. Axes without one default to auto.
    #[arg(long = "as", value_name = "TYPE")]
    types: Vec<String>,

    /// Target node, input, and base subfolder, e.g. '9:filename_prefix:SampleImageDemo'.
    /// That node's input is set to '<subfolder>/<segments>' per permutation.
    #[arg(long)]
    save_target: String,

    /// Do not POST or delete; print the plan and would-be cleanup actions.
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging (per-axis and per-submission detail).
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn axis_args(&self) -> [(AxisId, Option<&String>); AxisId::COUNT] {
        [
            (AxisId::S, self.s.as_ref()),
            (AxisId::T, self.t.as_ref()),
            (AxisId::U, self.u.as_ref()),
            (AxisId::V, self.v.as_ref()),
            (AxisId::X, self.x.as_ref()),
            (AxisId::Y, self.y.as_ref()),
            (AxisId::Z, self.z.as_ref()),
        ]
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Build the per-axis load specs, consuming the `--as` queue positionally
/// against supplied axes in canonical letter order. Extra `--as` words are
/// ignored; axes without one default to auto.
fn axis_specs(cli: &Cli) -> Result<[Option<AxisSpec>; AxisId::COUNT]> {
    let mut queue = cli.types.iter();
    let mut specs: [Option<AxisSpec>; AxisId::COUNT] = Default::default();
    for (id, arg) in cli.axis_args() {
        let Some(file_name) = arg else {
            continue;
        };
        let kind = match queue.next() {
            Some(word) => ValueKind::parse(id, word)?,
            None => ValueKind::Auto,
        };
        specs[id.slot()] = Some(AxisSpec {
            file_name: file_name.clone(),
            kind,
        });
    }
    Ok(specs)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let params_dir = cli.basepath.join("params");
    if !params_dir.is_dir() {
        bail!(
            "'{}' does not exist; expected <basepath>/params",
            params_dir.display()
        );
    }
    let images_root = params_dir.join("images");

    let workflow_path = match &cli.workflow_api {
        Some(p) if p.is_absolute() => p.clone(),
        Some(p) => cli.basepath.join(p),
        None => cli.basepath.join(DEFAULT_WORKFLOW_FILE),
    };
    let template = workflow::load_api_prompt(&workflow_path)?;

    let save_target = SaveTarget::parse(&cli.save_target)?;
    if cli.verbose {
        println!(
            "{} prefix token = '{}' (node {}, input '{}')",
            "info:".yellow().bold(),
            save_target.folder,
            save_target.node_id,
            save_target.input
        );
    }

    let set = AxisSet::load(axis_specs(&cli)?, &params_dir, &template)?;
    if cli.verbose {
        for axis in set.present() {
            println!(
                "{} axis {} -> node {}, input '{}', count={}",
                "info:".yellow().bold(),
                axis.id,
                axis.target.node_id,
                axis.target.input,
                axis.values.len()
            );
        }
    }

    let output_dir = images_root.join(&save_target.folder);
    let plan = reconcile::plan(&output_dir, &set);

    let factors: Vec<String> = AxisId::ALL
        .iter()
        .map(|id| set.get(*id).map_or(1, |a| a.values.len()).to_string())
        .collect();
    println!(
        "Planned permutations: {} = {}",
        factors.join(" * "),
        plan.total
    );

    if cli.dry_run {
        println!("{} folder = {}", "[DRY]".cyan(), output_dir.display());
        println!(
            "{} expected file count = {}",
            "[DRY]".cyan(),
            plan.expected.len()
        );
        for name in &plan.stray {
            println!("{} would remove extraneous file: {name}", "[DRY]".cyan());
        }
        for name in &plan.examples {
            println!("{} e.g. {}", "[DRY]".cyan(), output_dir.join(name).display());
        }
        println!(
            "{} {} of {} outputs already present",
            "[DRY]".cyan(),
            plan.already_present,
            plan.total
        );
        return Ok(());
    }

    let removed = reconcile::clean_output_dir(&output_dir, &plan.expected);
    if !removed.is_empty() {
        println!(
            "{} removed {} extraneous file(s)",
            "clean".yellow().bold(),
            removed.len()
        );
    }

    let client_id = cli
        .client_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut sink = client::HttpPromptSink::new(&cli.server, client_id)
        .context("failed to set up submission client")?;
    let outcome = run_sweep(&set, &template, &save_target, &output_dir, &mut sink)?;

    println!(
        "{} enqueued {} prompt(s) to {} ({} skipped). Images folder: {}",
        "done".green().bold(),
        outcome.submitted,
        cli.server,
        outcome.skipped,
        output_dir.display()
    );
    Ok(())
}
