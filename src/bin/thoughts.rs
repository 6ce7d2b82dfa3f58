//! thoughts CLI tool
//!
//! Command-line interface for editing a JSON record file with thoughtbase.
//!
//! ## Commands
//!
//! - `import <file>` / `export`: plain-text outlines in and out
//! - `add`, `rename`, `delete`, `move`: single mutations
//! - `children`, `contexts`: context index queries
//! - `check`: verify every store invariant
//!
//! Contexts are written as `/`-separated values (`Projects/2024`); an empty context is the root.
//! Ranked paths add a rank to each segment (`Projects@0/2024@3.5`).

use clap::{Parser, Subcommand};
use std::{fs::read_to_string, path::PathBuf};
use thoughtbase::{
    commands::Op,
    config::{Config, SettingsProvider, TomlSettingsProvider},
    outline::export_text,
    paths::{Context, RankedPath, RankedThought},
    persist::{JsonFileAdapter, PersistenceAdapter, SyncQueue},
    session::Session,
    thoughtbase::ThoughtBase,
    ThoughtError,
};

#[derive(Parser)]
#[command(name = "thoughts")]
#[command(author, version, about = "A tool for editing a multi-context thought outline", long_about = None)]
struct Cli {
    /// Record file to operate on
    #[arg(short, long, default_value = "thoughts.json")]
    store: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append an indented `- value` outline below a context
    Import {
        /// Outline file to read
        file: PathBuf,

        #[arg(long, default_value = "")]
        context: String,
    },

    /// Print a context and its descendants as an outline
    Export {
        #[arg(default_value = "")]
        context: String,
    },

    /// Add a thought to a context
    Add {
        value: String,

        #[arg(long, default_value = "")]
        context: String,

        /// Rank among siblings; defaults to after the last child
        #[arg(long)]
        rank: Option<f64>,
    },

    /// List the children of a context in rank order
    Children {
        #[arg(default_value = "")]
        context: String,
    },

    /// List every context a value appears in
    Contexts { value: String },

    /// Rename one occurrence of a thought
    Rename {
        old_value: String,
        new_value: String,

        #[arg(long, default_value = "")]
        context: String,

        #[arg(long, default_value_t = 0.0)]
        rank: f64,
    },

    /// Delete a thought and its descendants from a context
    Delete { context: String },

    /// Move an occurrence, e.g. `move a@0/b@0 d@1/b@2`
    Move { from: String, to: String },

    /// Verify the store and report every violation
    Check,
}

fn parse_context(arg: &str) -> Context {
    Context::new(arg.split('/').filter(|value| !value.is_empty()))
}

fn parse_path(arg: &str) -> Result<RankedPath, ThoughtError> {
    arg.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, rank) = segment.rsplit_once('@').ok_or_else(|| {
                ThoughtError::Command(format!("'{segment}' is missing an @rank suffix"))
            })?;
            let rank = rank
                .parse::<f64>()
                .map_err(|e| ThoughtError::Command(format!("bad rank in '{segment}': {e}")))?;
            Ok(RankedThought::new(key, rank))
        })
        .collect::<Result<Vec<_>, ThoughtError>>()
        .map(RankedPath::new)
}

/// Apply `op` and write every record it touched.
fn commit(session: &mut Session, adapter: &JsonFileAdapter, op: Op) -> Result<(), ThoughtError> {
    let mut queue = SyncQueue::default();
    let events = session.apply(op)?;
    for event in events.iter() {
        tracing::debug!("{event}");
    }
    queue.enqueue(&events);
    let report = queue.flush(session.thoughts(), adapter);
    tracing::info!(
        "Wrote {} and removed {} records in {:?}",
        report.written,
        report.removed,
        adapter.path()
    );
    match report.failed.into_iter().next() {
        Some((_, e)) => Err(e),
        None => Ok(()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => TomlSettingsProvider::new(path).get_config()?,
        None => Config::default(),
    };
    let adapter = JsonFileAdapter::open(&cli.store)?;
    let thoughts = ThoughtBase::from_records(adapter.snapshot()?)?;
    let mut session = Session::new(thoughts, config);

    match cli.command {
        Commands::Import { file, context } => {
            let text = read_to_string(&file)?;
            commit(
                &mut session,
                &adapter,
                Op::ImportText {
                    context: parse_context(&context),
                    text,
                },
            )?;
        }

        Commands::Export { context } => {
            println!("{}", export_text(session.thoughts(), parse_context(&context)));
        }

        Commands::Add {
            value,
            context,
            rank,
        } => {
            let context = parse_context(&context);
            let rank = rank.unwrap_or_else(|| session.thoughts().rank_at_end(&context));
            commit(
                &mut session,
                &adapter,
                Op::Create {
                    value,
                    context,
                    rank,
                },
            )?;
        }

        Commands::Children { context } => {
            for child in session.thoughts().children_of(parse_context(&context)) {
                println!("{child}");
            }
        }

        Commands::Contexts { value } => {
            for membership in session.thoughts().contexts_of(&value) {
                println!("{} @ {}", membership.context, membership.rank);
            }
        }

        Commands::Rename {
            old_value,
            new_value,
            context,
            rank,
        } => {
            commit(
                &mut session,
                &adapter,
                Op::Rename {
                    context: parse_context(&context),
                    old_value,
                    new_value,
                    rank,
                },
            )?;
        }

        Commands::Delete { context } => {
            commit(&mut session, &adapter, Op::Delete(parse_context(&context)))?;
        }

        Commands::Move { from, to } => {
            let op = Op::Move {
                from: parse_path(&from)?,
                to: parse_path(&to)?,
            };
            commit(&mut session, &adapter, op)?;
        }

        Commands::Check => {
            let errors = session.thoughts().built_in_test();
            if errors.is_empty() {
                println!("{} is consistent", session.thoughts());
            } else {
                for error in errors.iter() {
                    println!("{error}");
                }
                return Err(ThoughtError::InvariantViolation(format!(
                    "{} problems found",
                    errors.len()
                ))
                .into());
            }
        }
    }

    Ok(())
}
