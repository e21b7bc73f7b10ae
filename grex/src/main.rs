//! # Grex CLI Entry Point
//!
//! The main executable for the Grex tool. This file drives the application
//! lifecycle:
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`].
//! 2. **Resolution**: Connects to the target server and fetches the schema
//!    tree via `grex_core`.
//! 3. **Presentation**: Prints the tree as JSON, or a colored error to
//!    standard error.

mod cli;
mod formatter;

use clap::Parser;
use cli::{Cli, Commands};
use formatter::{FormattedString, ServiceList};
use grex_core::schema::Service;
use std::process;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    match args.command {
        Commands::Schema { compact } => print_schema(&args.url, compact).await,
        Commands::Services => print_services(&args.url).await,
    }
}

async fn fetch_or_exit(url: &str) -> Vec<Service> {
    match grex_core::get_info(url).await {
        Ok(services) => services,
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

async fn print_schema(url: &str, compact: bool) {
    let services = fetch_or_exit(url).await;

    let rendered = if compact {
        serde_json::to_string(&services)
    } else {
        serde_json::to_string_pretty(&services)
    };

    match rendered {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("{}", FormattedString::from(err));
            process::exit(1);
        }
    }
}

async fn print_services(url: &str) {
    let services = fetch_or_exit(url).await;

    let names = services
        .iter()
        .map(|service| {
            if service.package_name == service.name {
                service.name.clone()
            } else {
                format!("{}.{}", service.package_name, service.name)
            }
        })
        .collect();

    println!("{}", FormattedString::from(ServiceList(names)));
}
