//! # SocialGraph CLI Module
//!
//! Command-line front end over the store.
//!
//! ## Available Commands
//!
//! - `init` / `status` / `reset` - Database lifecycle
//! - `register` / `login` / `profile` / `edit` - Accounts
//! - `follow` / `unfollow` / `following` / `followers` / `mutual` - Connections
//! - `recommend` / `search` / `popular` - Discovery
//! - `seed` / `synthetic` / `import-edges` - Bulk loaders
//! - `export` / `import` - Snapshots
//! - `server` - Start the HTTP server

mod commands;

use crate::config::{Backend, Config};
use crate::loaders::{DEFAULT_MAX_NODES, DEFAULT_SYNTHETIC_SEED};
use clap::{Parser, Subcommand};
use socialgraph_core::SocialError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// SocialGraph - follow graph, recommendations and user search
#[derive(Parser, Debug)]
#[command(name = "socialgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the database (overrides config and SOCIALGRAPH_DB)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config and SOCIALGRAPH_BACKEND)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show store status
    Status,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Register a new user
    Register {
        username: String,
        name: String,
        email: String,

        /// Password (stored as a salted hash)
        #[arg(short = 'P', long)]
        password: String,

        /// Optional bio
        #[arg(long, default_value = "")]
        bio: String,
    },

    /// Check a username/password pair
    Login {
        username: String,

        #[arg(short = 'P', long)]
        password: String,
    },

    /// Show a user's profile
    Profile { username: String },

    /// Edit a user's profile (omitted fields are kept)
    Edit {
        username: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        bio: Option<String>,
    },

    /// Follow a user
    Follow { src: String, dst: String },

    /// Unfollow a user
    Unfollow { src: String, dst: String },

    /// List users that a user follows
    Following {
        username: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(short, long, default_value = "0")]
        skip: usize,
    },

    /// List a user's followers
    Followers {
        username: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(short, long, default_value = "0")]
        skip: usize,
    },

    /// Users followed by both A and B
    Mutual {
        a: String,
        b: String,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Friend-of-friend recommendations
    Recommend {
        username: String,

        #[arg(short, long, default_value = "15")]
        limit: usize,
    },

    /// Search users by username, name or email
    Search {
        query: String,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Users ranked by follower count
    Popular {
        #[arg(short, long, default_value = "15")]
        limit: usize,
    },

    /// Load the four demo users (password "password123")
    Seed,

    /// Generate a random graph of s001..sN
    Synthetic {
        #[arg(short, long, default_value = "1500")]
        users: usize,

        #[arg(short = 'd', long, default_value = "6")]
        avg_degree: usize,

        #[arg(short, long, default_value_t = DEFAULT_SYNTHETIC_SEED)]
        seed: u64,
    },

    /// Import a whitespace-separated edge list
    ImportEdges {
        /// Edge list: one `src dst` pair per line
        #[arg(short, long)]
        edges: PathBuf,

        /// Tab-separated profiles file with a header row
        #[arg(short, long)]
        profiles: Option<PathBuf>,

        #[arg(long, default_value_t = DEFAULT_MAX_NODES)]
        max_nodes: usize,

        /// Stop early once this many nodes (and --min-edges edges) are read
        #[arg(long, requires = "min_edges")]
        min_nodes: Option<usize>,

        #[arg(long, requires = "min_nodes")]
        min_edges: Option<usize>,
    },

    /// Export a snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (socg, json)
        #[arg(short = 't', long, default_value = "socg")]
        format: String,
    },

    /// Replace all content with a snapshot (socg or json)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Delete every user and relationship
    Reset {
        /// Required confirmation
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

impl Cli {
    /// Resolve the layered configuration with this invocation's flags on top.
    pub fn resolve_config(&self) -> Result<Config, SocialError> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        Ok(config)
    }
}

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli, config: Config) -> Result<(), SocialError> {
    let json_mode = cli.json_mode;
    let config = &config;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            let mut config = config.clone();
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Status) | None => cmd_status(config, json_mode),
        Some(Commands::Init { force }) => cmd_init(config, force),
        Some(Commands::Register {
            username,
            name,
            email,
            password,
            bio,
        }) => cmd_register(config, json_mode, &username, &name, &email, &bio, &password),
        Some(Commands::Login { username, password }) => {
            cmd_login(config, json_mode, &username, &password)
        }
        Some(Commands::Profile { username }) => cmd_profile(config, json_mode, &username),
        Some(Commands::Edit {
            username,
            name,
            email,
            bio,
        }) => cmd_edit(config, json_mode, &username, name, email, bio),
        Some(Commands::Follow { src, dst }) => cmd_follow(config, json_mode, &src, &dst),
        Some(Commands::Unfollow { src, dst }) => cmd_unfollow(config, json_mode, &src, &dst),
        Some(Commands::Following {
            username,
            limit,
            skip,
        }) => cmd_following(config, json_mode, &username, limit, skip),
        Some(Commands::Followers {
            username,
            limit,
            skip,
        }) => cmd_followers(config, json_mode, &username, limit, skip),
        Some(Commands::Mutual { a, b, limit }) => cmd_mutual(config, json_mode, &a, &b, limit),
        Some(Commands::Recommend { username, limit }) => {
            cmd_recommend(config, json_mode, &username, limit)
        }
        Some(Commands::Search { query, limit }) => cmd_search(config, json_mode, &query, limit),
        Some(Commands::Popular { limit }) => cmd_popular(config, json_mode, limit),
        Some(Commands::Seed) => cmd_seed(config, json_mode),
        Some(Commands::Synthetic {
            users,
            avg_degree,
            seed,
        }) => cmd_synthetic(config, json_mode, users, avg_degree, seed),
        Some(Commands::ImportEdges {
            edges,
            profiles,
            max_nodes,
            min_nodes,
            min_edges,
        }) => cmd_import_edges(
            config,
            json_mode,
            &edges,
            profiles.as_deref(),
            crate::loaders::ImportLimits {
                max_nodes,
                min_nodes,
                min_edges,
            },
        ),
        Some(Commands::Export { output, format }) => cmd_export(config, &output, &format),
        Some(Commands::Import { input }) => cmd_import(config, &input),
        Some(Commands::Reset { force }) => cmd_reset(config, force),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "socialgraph",
            "search",
            "alice",
            "--limit",
            "5",
            "--backend",
            "memory",
            "--json-mode",
        ])
        .expect("parse");

        assert!(cli.json_mode);
        assert_eq!(cli.backend, Some(Backend::Memory));
        assert!(matches!(
            cli.command,
            Some(Commands::Search { ref query, limit: 5 }) if query == "alice"
        ));
    }

    #[test]
    fn min_nodes_requires_min_edges() {
        let result = Cli::try_parse_from([
            "socialgraph",
            "import-edges",
            "--edges",
            "edges.txt",
            "--min-nodes",
            "10",
        ]);
        assert!(result.is_err());
    }
}
