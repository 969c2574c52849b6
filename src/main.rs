use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;

use slurm_env_gen::api::scenario_dto::ScenarioDto;
use slurm_env_gen::domain::scenario::Scenario;
use slurm_env_gen::domain::topology::topology::Topology;
use slurm_env_gen::domain::utils::random::{derive_rng, rng_from_seed};
use slurm_env_gen::domain::workload::job::JobKind;
use slurm_env_gen::domain::workload::job_generator::JobGenerator;
use slurm_env_gen::domain::workload::workload::{WorkLoad, WorkloadEntry};
use slurm_env_gen::loader::{parser, writer};
use slurm_env_gen::{load_scenario_dto, logger};

const NODE_CONFIG_FILE: &str = "slurm.conf";
const TOPOLOGY_FILE: &str = "topology.conf";
const GRES_CONFIG_FILE: &str = "gres.conf";
const EVENTS_FILE: &str = "workload.events";
const STATISTICS_FILE: &str = "workload_stats.csv";

#[derive(Parser, Debug)]
#[command(name = "slurm-env-gen")]
#[command(about = "Synthesizes Slurm cluster topologies and feasible job workloads", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace). Overrides RUST_LOG.
    #[arg(long, global = true)]
    log_level: Option<LevelFilter>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GeneratorArgs {
    /// Scenario configuration (JSON). Defaults are used for omitted fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Master seed, overrides the one in the configuration.
    #[arg(short, long)]
    seed: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a cluster and write its node lines and switch tree.
    Topology {
        #[command(flatten)]
        generator: GeneratorArgs,

        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
    },

    /// Generate jobs for an existing cluster description.
    Workload {
        #[command(flatten)]
        generator: GeneratorArgs,

        /// slurm.conf holding the NodeName= lines
        #[arg(long)]
        slurm_conf: PathBuf,

        #[arg(long)]
        topology: PathBuf,

        /// users.sim (name:uid:group:gid per line)
        #[arg(long)]
        users: PathBuf,

        /// JSON object mapping user names to accounts
        #[arg(long)]
        accounts: Option<PathBuf>,

        /// Number of jobs, overrides the configuration.
        #[arg(short = 'n', long)]
        jobs: Option<usize>,

        #[arg(short, long, default_value = EVENTS_FILE)]
        output: PathBuf,

        /// Also write per-job statistics as CSV.
        #[arg(long)]
        stats: Option<PathBuf>,
    },

    /// Generate a cluster and a workload for it.
    Scenario {
        #[command(flatten)]
        generator: GeneratorArgs,

        #[arg(long)]
        users: PathBuf,

        #[arg(long)]
        accounts: Option<PathBuf>,

        #[arg(short = 'n', long)]
        jobs: Option<usize>,

        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
    },
}

fn load_dto(generator: &GeneratorArgs, jobs: Option<usize>) -> anyhow::Result<ScenarioDto> {
    let mut dto = load_scenario_dto(generator.config.as_deref()).context("could not load scenario configuration")?;
    if generator.seed.is_some() {
        dto.seed = generator.seed;
    }
    if let Some(jobs) = jobs {
        dto.workload.job_count = jobs;
    }
    Ok(dto)
}

fn print_topology_summary(topology: &Topology) {
    println!("{}", "Cluster".green().bold());
    for node in topology.nodes() {
        println!("  {}", node);
    }
    println!("  {} node groups, {} machines", topology.nodes().len().to_string().cyan(), topology.total_machines().to_string().cyan());
}

fn print_workload_summary(entries: &[WorkloadEntry]) {
    let count = |kind: JobKind| entries.iter().filter(|entry| entry.job.kind == kind).count();
    let fallbacks = entries.iter().filter(|entry| entry.fallback).count();
    let span = entries.last().map(|entry| entry.arrival).unwrap_or(0);

    println!("{}", "Workload".green().bold());
    println!(
        "  {} jobs ({} classic, {} gpu, {} generic) over {} s",
        entries.len().to_string().cyan(),
        count(JobKind::Classic),
        count(JobKind::Gpu),
        count(JobKind::Generic),
        span
    );
    if fallbacks > 0 {
        println!("  {}", format!("{} jobs fell back to classic", fallbacks).yellow());
    }
}

fn write_cluster(out_dir: &Path, topology: &Topology) -> anyhow::Result<()> {
    writer::write_node_config(out_dir.join(NODE_CONFIG_FILE), None, topology.nodes())?;
    writer::write_topology(out_dir.join(TOPOLOGY_FILE), topology)?;
    writer::write_gres_config(out_dir.join(GRES_CONFIG_FILE), topology.nodes())?;
    Ok(())
}

fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Topology { generator, out_dir } => {
            let mut scenario = Scenario::new(load_dto(&generator, None)?)?;
            let topology = scenario.generate_topology();

            write_cluster(&out_dir, &topology)?;
            print_topology_summary(&topology);
            println!("Wrote {}, {} and {} to '{}'", NODE_CONFIG_FILE, TOPOLOGY_FILE, GRES_CONFIG_FILE, out_dir.display());
        }
        Command::Workload { generator, slurm_conf, topology, users, accounts, jobs, output, stats } => {
            let dto = load_dto(&generator, jobs)?;

            let nodes = parser::read_node_config(&slurm_conf).with_context(|| format!("could not read '{}'", slurm_conf.display()))?;
            let topology = parser::read_topology(&nodes, &topology).with_context(|| format!("could not read '{}'", topology.display()))?;
            let users = parser::read_users(&users).with_context(|| format!("could not read '{}'", users.display()))?;
            let accounts = match accounts {
                Some(path) => parser::read_accounts(&path).with_context(|| format!("could not read '{}'", path.display()))?,
                None => Default::default(),
            };

            let mut rng = rng_from_seed(dto.seed);
            let job_generator = JobGenerator::try_from((&dto.job_generator, Arc::new(topology), derive_rng(&mut rng)))?;
            let mut workload = WorkLoad::try_from((&dto.workload, users, accounts, job_generator, rng))?;
            let entries = workload.generate_workload(dto.workload.job_count, true);

            writer::write_events(&output, &entries)?;
            if let Some(stats) = stats {
                writer::write_workload_statistics(&stats, &entries)?;
            }
            print_workload_summary(&entries);
            println!("Wrote events to '{}'", output.display());
        }
        Command::Scenario { generator, users, accounts, jobs, out_dir } => {
            let dto = load_dto(&generator, jobs)?;
            let users = parser::read_users(&users).with_context(|| format!("could not read '{}'", users.display()))?;
            let accounts = match accounts {
                Some(path) => parser::read_accounts(&path).with_context(|| format!("could not read '{}'", path.display()))?,
                None => Default::default(),
            };

            let generated = slurm_env_gen::generate_scenario(dto, users, accounts)?;

            write_cluster(&out_dir, &generated.topology)?;
            writer::write_events(out_dir.join(EVENTS_FILE), &generated.entries)?;
            writer::write_workload_statistics(out_dir.join(STATISTICS_FILE), &generated.entries)?;

            print_topology_summary(&generated.topology);
            print_workload_summary(&generated.entries);
            println!("Wrote scenario to '{}'", out_dir.display());
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(cli.log_level);

    run(cli.command).inspect_err(|e| log::error!("{:#}", e))
}
