//! # CLI
//!
//! This module defines the command-line interface of `grex` using `clap`.
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "grex", version, about = "gRPC schema explorer")]
pub struct Cli {
    /// The server URL to connect to (e.g. http://localhost:50051)
    pub url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dump the full schema tree of a server as JSON
    ///
    /// Connects to the server, resolves every exposed service through the
    /// reflection protocol and prints the resulting tree to stdout.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// grex http://localhost:50051 schema | jq '.[].methods[].name'
    /// ```
    Schema {
        /// Print compact JSON instead of pretty-printed output
        #[arg(long)]
        compact: bool,
    },

    /// List the user-facing services exposed by a server
    Services,
}
