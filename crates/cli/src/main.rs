//! smed CLI - time and analyze line changeovers.

mod console;
mod display;

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;
use smed_analysis::{build_dataset, export_rows, AnalysisFilter, SortKey, SortSpec};
use smed_core::{ConfigLimits, OperationId, OperationPatch, OperatorId, PersistedState, PhaseId, SessionResults};
use smed_session::{Session, SessionOptions, SystemClock};
use smed_storage::{load_or_default, JsonStorage, Storage};

#[derive(Parser)]
#[command(name = "smed")]
#[command(about = "Time and analyze line changeovers", long_about = None)]
struct Cli {
    /// Directory holding the stored state
    #[arg(long, global = true, default_value = ".smed")]
    data_dir: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Timer refresh interval of the run console, in milliseconds
    #[arg(long, global = true, default_value_t = 500)]
    tick_ms: u64,

    /// Largest team that operator edits allow
    #[arg(long, global = true, default_value_t = ConfigLimits::default().max_operators)]
    max_operators: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or reset the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Edit the team
    #[command(subcommand)]
    Operator(OperatorCommand),
    /// Edit operations
    #[command(subcommand)]
    Operation(OperationCommand),
    /// Edit phases
    #[command(subcommand)]
    Phase(PhaseCommand),
    /// Analyze the last completed run
    Analyze(AnalyzeArgs),
    /// Open the interactive run console
    Run,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print operators, phases and operations
    Show,
    /// Replace the configuration with the demo one
    Reset,
}

#[derive(Subcommand)]
enum OperatorCommand {
    /// Add an operator
    Add,
    /// Remove an operator; their operations go to the first remaining one
    Remove {
        /// Operator ID
        id: String,
    },
    /// Rename an operator
    Rename {
        /// Operator ID
        id: String,
        /// New name
        name: String,
    },
}

#[derive(Args)]
struct OperationFields {
    /// Label
    #[arg(long)]
    label: Option<String>,
    /// Assigned operator ID
    #[arg(long)]
    operator: Option<String>,
    /// Target duration in minutes
    #[arg(long)]
    target: Option<f64>,
}

impl OperationFields {
    fn into_patch(self) -> OperationPatch {
        OperationPatch {
            label: self.label,
            operator_id: self.operator.map(OperatorId::from),
            target_minutes: self.target,
        }
    }
}

#[derive(Subcommand)]
enum OperationCommand {
    /// Append an operation to a phase
    Add {
        /// Phase ID
        phase: String,
        #[command(flatten)]
        fields: OperationFields,
    },
    /// Remove an operation and its recorded results
    Remove {
        /// Operation ID
        id: String,
    },
    /// Move an operation within its phase
    Move {
        /// Phase ID
        phase: String,
        /// Current position (0-based)
        from: usize,
        /// New position (0-based)
        to: usize,
    },
    /// Change an operation
    Set {
        /// Operation ID
        id: String,
        #[command(flatten)]
        fields: OperationFields,
    },
}

#[derive(Subcommand)]
enum PhaseCommand {
    /// Select the preparation phase; omit the ID for none
    External {
        /// Phase ID
        id: Option<String>,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Only this operator
    #[arg(long)]
    operator: Option<String>,
    /// Only this phase
    #[arg(long)]
    phase: Option<String>,
    /// Sort key: phase, label, operator, target, actual, delta, achievement
    #[arg(long, default_value = "phase")]
    sort: SortKey,
    /// Sort descending
    #[arg(long)]
    desc: bool,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Open storage
    let mut storage = JsonStorage::new(&cli.data_dir)
        .await
        .with_context(|| format!("Cannot open data directory {}", cli.data_dir.display()))?;
    let state = load_or_default(&storage, chrono::Utc::now()).await;
    let options = SessionOptions::default()
        .with_tick_interval(Duration::from_millis(cli.tick_ms.max(1)))
        .with_limits(ConfigLimits {
            max_operators: cli.max_operators,
            ..ConfigLimits::default()
        });
    let mut session = Session::with_system_clock(state).with_options(options);

    match cli.command {
        Commands::Config(ConfigCommand::Show) => {
            print!("{}", display::render_config(session.config(), session.last_run()));
        }
        Commands::Config(ConfigCommand::Reset) => {
            let demo = PersistedState::demo(chrono::Utc::now());
            session.replace_config(demo.config);
            save(&mut session, &mut storage).await?;
            println!("Configuration reset to the demo changeover.");
        }
        Commands::Operator(command) => {
            match command {
                OperatorCommand::Add => {
                    let id = session.add_operator()?;
                    println!("Added operator {} ({})", id, session.config().operator_name(&id));
                }
                OperatorCommand::Remove { id } => {
                    let reassigned = session.remove_operator(&OperatorId::from(id.as_str()))?;
                    println!("Removed operator {}; {} operation(s) reassigned", id, reassigned.len());
                }
                OperatorCommand::Rename { id, name } => {
                    session.rename_operator(&OperatorId::from(id.as_str()), &name)?;
                    println!("Renamed operator {}", id);
                }
            }
            save(&mut session, &mut storage).await?;
        }
        Commands::Operation(command) => {
            match command {
                OperationCommand::Add { phase, fields } => {
                    let id = session.add_operation(&PhaseId::from(phase.as_str()), fields.into_patch())?;
                    println!("Added operation {}", id);
                }
                OperationCommand::Remove { id } => {
                    session.remove_operation(&OperationId::from(id.as_str()))?;
                    println!("Removed operation {}", id);
                }
                OperationCommand::Move { phase, from, to } => {
                    session.move_operation(&PhaseId::from(phase.as_str()), from, to)?;
                    println!("Moved operation {} -> {} in {}", from, to, phase);
                }
                OperationCommand::Set { id, fields } => {
                    let patch = fields.into_patch();
                    if patch == OperationPatch::default() {
                        bail!("Nothing to change: pass --label, --operator or --target");
                    }
                    session.update_operation(&OperationId::from(id.as_str()), patch)?;
                    println!("Updated operation {}", id);
                }
            }
            save(&mut session, &mut storage).await?;
        }
        Commands::Phase(PhaseCommand::External { id }) => {
            let phase = id.map(PhaseId::from);
            session.set_external_phase(phase.as_ref())?;
            save(&mut session, &mut storage).await?;
            match phase {
                Some(phase) => println!("Preparation phase: {}", phase),
                None => println!("No preparation phase"),
            }
        }
        Commands::Analyze(args) => {
            let filter = AnalysisFilter {
                operator: args.operator.map(OperatorId::from),
                phase: args.phase.map(PhaseId::from),
            };
            let sort = if args.desc {
                SortSpec::descending(args.sort)
            } else {
                SortSpec::new(args.sort)
            };
            let dataset = build_dataset(
                session.config(),
                &SessionResults::new(),
                session.last_run(),
                &filter,
                sort,
            );
            if args.json {
                let report = serde_json::json!({
                    "operations": export_rows(&dataset),
                    "phases": dataset.phases,
                    "global": dataset.global,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", display::render_analysis(&dataset));
            }
        }
        Commands::Run => {
            console::run(session, &mut storage).await?;
        }
    }

    Ok(())
}

/// Persist the snapshot queued by the last edit.
async fn save(session: &mut Session<SystemClock>, storage: &mut JsonStorage) -> Result<()> {
    if let Some(snapshot) = session.take_pending_snapshot() {
        let meta = storage.save_state(&snapshot).await?;
        debug!("Saved revision {}", meta.revision);
    }
    Ok(())
}
