//! Command-line interface for rtsync
//!
//! This module defines the CLI structure using clap derive macros.
//! Commands are grouped into submodules by what they touch: tickets,
//! history, links, the mirror and the name table.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gateway::{Gateway, HttpTransport};
use crate::links::RelationKind;
use crate::mirror::FileMirror;
use crate::output::OutputOptions;
use crate::profile::resolve_profile;

mod history;
mod link;
mod names;
mod pull;
mod ticket;

/// Search used by `names refresh` when no query is given.
pub const DEFAULT_NAMES_QUERY: &str = "Status != 'resolved' AND Status != 'rejected'";

/// rtsync - ticket mirror and link synchronizer
///
/// Reads tickets from a REST 1.0 ticketing service, keeps a local mirror of
/// them, and edits parent/child, dependency and reference links on both
/// ends at once.
#[derive(Parser, Debug)]
#[command(name = "rtsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to ./.rtsync.toml)
    #[arg(long, global = true, env = "RTSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server base url, overrides server.url
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Login name, overrides server.user
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a ticket with its links and description
    Show {
        /// Ticket id
        id: String,

        /// Skip fetching links
        #[arg(long)]
        no_links: bool,

        /// Skip fetching the description
        #[arg(long)]
        no_description: bool,
    },

    /// Search tickets
    Search {
        /// Query in the service's search syntax
        query: String,

        /// Include subjects
        #[arg(long)]
        subjects: bool,
    },

    /// List queues
    Queues,

    /// Create a ticket
    Create {
        #[arg(long)]
        queue: String,

        #[arg(long)]
        subject: String,

        /// Initial ticket text
        #[arg(long)]
        text: Option<String>,

        /// Additional fields, e.g. --set Priority=10
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },

    /// Add a comment to a ticket
    Comment {
        id: String,

        #[arg(long)]
        text: String,
    },

    /// Change ticket fields
    Edit {
        id: String,

        /// Field assignments, e.g. --set Status=open
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        set: Vec<String>,
    },

    /// Resolve a ticket, then optionally comment on it
    Resolve {
        id: String,

        #[arg(long)]
        comment: Option<String>,
    },

    /// Show ticket history
    History {
        id: String,

        /// Full transactions instead of one-line summaries
        #[arg(long)]
        long: bool,

        /// Only comments and correspondence
        #[arg(long)]
        comments: bool,

        /// A single transaction by id
        #[arg(long, value_name = "HISTORY_ID")]
        entry: Option<String>,
    },

    /// Show the links of a ticket
    Links { id: String },

    /// Attach or detach links on both tickets
    #[command(subcommand)]
    Link(LinkCommands),

    /// Fetch tickets into the local mirror
    Pull {
        /// Ticket ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Ticket id -> name table
    #[command(subcommand)]
    Names(NamesCommands),
}

#[derive(Subcommand, Debug)]
pub enum LinkCommands {
    /// Link child to parent
    Attach(LinkArgs),
    /// Unlink child from parent
    Detach(LinkArgs),
}

#[derive(Args, Debug)]
pub struct LinkArgs {
    #[arg(long)]
    pub parent: String,

    #[arg(long)]
    pub child: String,

    /// member, dependency or reference
    #[arg(long)]
    pub kind: RelationKind,

    /// Overwrite existing links instead of merging with them
    #[arg(long)]
    pub clobber: bool,

    /// Leave the local mirror untouched
    #[arg(long)]
    pub no_mirror: bool,
}

#[derive(Subcommand, Debug)]
pub enum NamesCommands {
    /// Rebuild the table from a search
    Refresh {
        #[arg(long, default_value = DEFAULT_NAMES_QUERY)]
        query: String,
    },
    /// Look up one ticket's name
    Get { id: String },
}

/// Settings shared by every command.
pub(crate) struct Context {
    pub config: Config,
    /// Directory relative mirror paths resolve against.
    pub base: PathBuf,
    pub server: Option<String>,
    pub user: Option<String>,
    pub output: OutputOptions,
}

impl Context {
    fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let (config, base) = match &cli.config {
            Some(path) => {
                let config = Config::load(path)?;
                let base = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| cwd.clone());
                (config, base)
            }
            None => (Config::load_from_dir(&cwd), cwd),
        };

        Ok(Self {
            config,
            base,
            server: cli.server.clone(),
            user: cli.user.clone(),
            output: OutputOptions {
                json: cli.json,
                quiet: cli.quiet,
            },
        })
    }

    pub fn gateway(&self) -> Result<Gateway> {
        let profile = resolve_profile(&self.config, self.server.as_deref(), self.user.as_deref())?;
        tracing::debug!(server = %profile.server, "connecting");
        let transport = HttpTransport::new(&profile.server, profile.credentials, profile.timeout)?;
        Ok(Gateway::new(Arc::new(transport)))
    }

    pub fn mirror(&self) -> FileMirror {
        FileMirror::from_config(&self.config, &self.base)
    }
}

/// Run a future to completion on a fresh runtime.
pub(crate) fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

/// Split `Field=Value` arguments.
pub(crate) fn parse_assignments(values: &[String]) -> Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|raw| {
            let (name, value) = raw.split_once('=').ok_or_else(|| {
                Error::InvalidArgument(format!("expected FIELD=VALUE, got '{raw}'"))
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "missing field name in '{raw}'"
                )));
            }
            Ok((name.to_string(), value.to_string()))
        })
        .collect()
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let context = Context::load(&self)?;
        match self.command {
            Commands::Show {
                id,
                no_links,
                no_description,
            } => ticket::run_show(
                &context,
                ticket::ShowOptions {
                    id,
                    links: !no_links,
                    description: !no_description,
                },
            ),
            Commands::Search { query, subjects } => {
                ticket::run_search(&context, ticket::SearchOptions { query, subjects })
            }
            Commands::Queues => ticket::run_queues(&context),
            Commands::Create {
                queue,
                subject,
                text,
                set,
            } => ticket::run_create(
                &context,
                ticket::CreateOptions {
                    queue,
                    subject,
                    text,
                    fields: parse_assignments(&set)?,
                },
            ),
            Commands::Comment { id, text } => ticket::run_comment(&context, &id, &text),
            Commands::Edit { id, set } => ticket::run_edit(&context, &id, parse_assignments(&set)?),
            Commands::Resolve { id, comment } => {
                ticket::run_resolve(&context, &id, comment.as_deref())
            }
            Commands::History {
                id,
                long,
                comments,
                entry,
            } => history::run_history(
                &context,
                history::HistoryOptions {
                    id,
                    long,
                    comments,
                    entry,
                },
            ),
            Commands::Links { id } => history::run_links(&context, &id),
            Commands::Link(cmd) => match cmd {
                LinkCommands::Attach(args) => {
                    link::run(&context, link::LinkOptions::from_args(args, crate::links::LinkOp::Attach))
                }
                LinkCommands::Detach(args) => {
                    link::run(&context, link::LinkOptions::from_args(args, crate::links::LinkOp::Detach))
                }
            },
            Commands::Pull { ids } => pull::run(&context, &ids),
            Commands::Names(cmd) => match cmd {
                NamesCommands::Refresh { query } => names::run_refresh(&context, &query),
                NamesCommands::Get { id } => names::run_get(&context, &id),
            },
        }
    }
}
