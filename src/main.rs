use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use docket::core::SystemClock;
use docket::{Docket, DocketConfig, MemoryStore, StoreTransaction, Template};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

const DEFAULT_SNAPSHOT: &str = "docket.json";

#[derive(Parser)]
#[command(name = "docket")]
#[command(about = "Manage document number series backed by a local snapshot")]
struct Cli {
    /// Snapshot file; overrides DOCKET_SNAPSHOT
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Actor recorded in audit fields; overrides DOCKET_ACTOR
    #[arg(long, global = true)]
    actor: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a value with a template without touching any series
    Format { template: String, value: u64 },
    /// Create a number series for a module
    Define {
        module: String,
        template: String,
        #[arg(long, default_value_t = 0)]
        last: u64,
    },
    /// Issue the next number(s) of a module
    Next {
        module: String,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Show the next number without consuming it
    Preview { module: String },
    List,
    Retemplate { module: String, template: String },
    /// Move a counter forward after numbers were issued elsewhere
    FastForward { module: String, last: u64 },
    Remove { module: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    let mut config = DocketConfig::default().from_env().map_err(|e| anyhow!(e))?;
    if let Some(path) = cli.snapshot {
        config = config.snapshot_path(path);
    }
    if let Some(actor) = cli.actor.as_deref() {
        config = config.system_actor(actor);
    }
    config.validate().map_err(|e| anyhow!(e))?;

    if let Command::Format { template, value } = &cli.command {
        println!("{}", render(&config, template, *value)?);
        return Ok(());
    }

    let path = config
        .snapshot_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT));
    let store = MemoryStore::load_or_empty(&path, config.lock_timeout)
        .with_context(|| format!("Failed to load snapshot '{}'", path.display()))?;
    let docket = Docket::new(store, config, Arc::new(SystemClock))?;

    let dirty = run(&docket, cli.command).await?;
    if dirty {
        docket
            .store()
            .save_to(&path)
            .await
            .with_context(|| format!("Failed to save snapshot '{}'", path.display()))?;
    }
    Ok(())
}

/// Render `value` with the configured placeholder, like the issued numbers are.
fn render(config: &DocketConfig, template: &str, value: u64) -> docket::Result<String> {
    Ok(Template::parse_with(template, config.placeholder)?.render(value))
}

/// Execute one command. Returns whether the store changed.
async fn run(docket: &Docket<MemoryStore>, command: Command) -> Result<bool> {
    let sequences = docket.sequences().store();
    let actor = docket.config().system_actor.clone();

    match command {
        Command::Format { .. } => Ok(false),
        Command::Define {
            module,
            template,
            last,
        } => {
            let defined = docket.define_sequence(&module, &template, last).await?;
            println!("{} {} (last {})", defined.module, defined.template, defined.last_number);
            Ok(true)
        }
        Command::Next { module, count } => {
            let mut tx = docket.begin().await?;
            let mut issued = Vec::with_capacity(count as usize);
            for _ in 0..count {
                issued.push(docket.next_number_in(&mut tx, &module).await?);
            }
            tx.commit().await?;
            for number in issued {
                println!("{number}");
            }
            Ok(true)
        }
        Command::Preview { module } => {
            let mut tx = docket.begin().await?;
            println!("{}", docket.sequences().preview(&mut tx, &module).await?);
            tx.rollback().await?;
            Ok(false)
        }
        Command::List => {
            let mut tx = docket.begin().await?;
            let definitions = sequences.list(&mut tx).await?;
            tx.rollback().await?;
            if definitions.is_empty() {
                println!("No sequences defined");
            }
            for definition in definitions {
                println!(
                    "{:<12} {:<24} {:>10}  {}",
                    definition.module,
                    definition.template,
                    definition.last_number,
                    definition.audit.modified_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(false)
        }
        Command::Retemplate { module, template } => {
            let mut tx = docket.begin().await?;
            let changed = sequences.retemplate(&mut tx, &module, &template, &actor).await?;
            tx.commit().await?;
            println!("{} {}", changed.module, changed.template);
            Ok(true)
        }
        Command::FastForward { module, last } => {
            let mut tx = docket.begin().await?;
            let moved = sequences.fast_forward(&mut tx, &module, last, &actor).await?;
            tx.commit().await?;
            println!("{} last {}", moved.module, moved.last_number);
            Ok(true)
        }
        Command::Remove { module } => {
            let mut tx = docket.begin().await?;
            let removed = sequences.remove(&mut tx, &module).await?;
            tx.commit().await?;
            println!("Removed {} (last {})", removed.module, removed.last_number);
            Ok(true)
        }
    }
}
