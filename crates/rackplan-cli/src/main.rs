use clap::{Parser, Subcommand};

mod commands;
mod report;

#[derive(Parser)]
#[command(
    name = "rackctl",
    about = "rackplan — rack layout optimizer and thermal evaluator",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the thermal picture of a rack as currently laid out
    Thermal {
        /// JSON inventory with racks, devices, and connections
        #[arg(short, long)]
        inventory: String,
        /// Rack to evaluate
        #[arg(short, long)]
        rack: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
        /// rackplan.toml with model coefficients
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Propose a better placement for a rack's unlocked devices.
    ///
    /// Devices flagged `locked` in the inventory never move; --lock adds
    /// more. Weights default to [weights] in rackplan.toml, or
    /// cable=0.30,weight=0.25,thermal=0.25,access=0.20.
    Optimize {
        #[arg(short, long)]
        inventory: String,
        #[arg(short, long)]
        rack: String,
        /// Keep this device where it is (repeatable)
        #[arg(short, long = "lock")]
        lock: Vec<String>,
        /// Objective weights, e.g. cable=1,thermal=0.5 (missing keys are 0)
        #[arg(short, long)]
        weights: Option<String>,
        /// Unplaced inventory device to fit into the rack (repeatable)
        #[arg(long = "add")]
        add: Vec<String>,
        /// Search seed
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        max_iterations: Option<u32>,
        /// Wall-clock budget for the search in milliseconds
        #[arg(long)]
        time_budget_ms: Option<u64>,
        #[arg(short, long, default_value = "text")]
        format: String,
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Manage rackplan.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a rackplan.toml with every setting at its default
    Init {
        #[arg(short, long, default_value = "rackplan.toml")]
        path: String,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rackctl=info".parse()?)
                .add_directive("rackplan_optimizer=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Thermal { inventory, rack, format, config } => {
            commands::thermal::thermal(&inventory, &rack, &format, config.as_deref())
        }
        Commands::Optimize {
            inventory,
            rack,
            lock,
            weights,
            add,
            seed,
            max_iterations,
            time_budget_ms,
            format,
            config,
        } => {
            let args = commands::optimize::OptimizeArgs {
                inventory,
                rack,
                lock,
                weights,
                add,
                seed,
                max_iterations,
                time_budget_ms,
                config,
            };
            commands::optimize::optimize(&args, &format)
        }
        Commands::Config { action } => match action {
            ConfigAction::Init { path, force } => commands::config::init(&path, force),
        },
    }
}
