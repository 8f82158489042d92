//! # orderdesk
//!
//! Command-line entry point.
//!
//! ## Usage
//! ```bash
//! orderdesk [--config <PATH>] <COMMAND>
//!
//! orderdesk migrate                  # create or upgrade the database
//! orderdesk catalog --customer c-42  # purchasable products, priced for c-42
//! orderdesk export c-42              # c-42's orders as JSON lines
//! orderdesk health                   # exit 1 if the database is unreachable
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context};
use orderdesk_service::{AppConfig, OrderDesk};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
OrderDesk

Usage: orderdesk [--config <PATH>] <COMMAND>

Commands:
  migrate                   Apply pending database migrations
  catalog [--customer ID]   List purchasable products with resolved prices
  export [CUSTOMER_ID]      Print canonical orders as JSON lines, most recent first
  health                    Check database connectivity

Options:
  -c, --config <PATH>       Config file (default: platform config directory)
  -h, --help                Show this help message";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Migrate,
    Catalog { customer_id: Option<String> },
    Export { customer_id: Option<String> },
    Health,
}

#[derive(Debug)]
struct Cli {
    config_path: Option<PathBuf>,
    command: Command,
}

/// `Ok(None)` means help was requested.
fn parse_args(args: &[String]) -> anyhow::Result<Option<Cli>> {
    let mut config_path = None;
    let mut positional = Vec::new();
    let mut customer_flag = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                let path = args.get(i + 1).context("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
                i += 1;
            }
            "--customer" => {
                let id = args.get(i + 1).context("--customer needs an id")?;
                customer_flag = Some(id.clone());
                i += 1;
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("migrate") => Command::Migrate,
        Some("catalog") => Command::Catalog {
            customer_id: customer_flag,
        },
        Some("export") => Command::Export {
            customer_id: positional.next(),
        },
        Some("health") => Command::Health,
        Some(other) => bail!("unknown command: {other}"),
        None => return Ok(None),
    };

    Ok(Some(Cli {
        config_path,
        command,
    }))
}

/// Log level defaults to `info`, overridable with `RUST_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,orderdesk=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(cli) = parse_args(&args)? else {
        println!("{USAGE}");
        return Ok(());
    };

    init_tracing();

    let config = AppConfig::load(cli.config_path).context("loading configuration")?;
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    info!(path = %db_path.display(), "Using database");

    let (db, desk) = OrderDesk::connect(&config)
        .await
        .context("opening database")?;

    match cli.command {
        Command::Migrate => {
            println!("✓ Database at {} is up to date", db_path.display());
        }
        Command::Catalog { customer_id } => {
            let listing = desk.catalog.listing(customer_id.as_deref(), true).await?;
            for entry in &listing {
                for quote in &entry.quotes {
                    println!(
                        "{:<32} {:>10} {:>10}  {:?}",
                        quote.display_name,
                        quote.prices.before_tax,
                        quote.prices.with_tax,
                        quote.source
                    );
                }
            }
            info!(products = listing.len(), "Catalog printed");
        }
        Command::Export { customer_id } => {
            let orders = desk.orders.list_for_customer(customer_id.as_deref()).await?;
            for order in &orders {
                println!("{}", serde_json::to_string(order)?);
            }
            info!(orders = orders.len(), "Orders exported");
        }
        Command::Health => {
            if !db.health_check().await {
                db.close().await;
                bail!("database is not reachable");
            }
            println!("✓ Database healthy");
        }
    }

    db.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        let cli = parse_args(&args(&["--config", "x.toml", "export", "c-1"]))
            .unwrap()
            .unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("x.toml")));
        assert_eq!(
            cli.command,
            Command::Export {
                customer_id: Some("c-1".into())
            }
        );

        let cli = parse_args(&args(&["catalog", "--customer", "c-2"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            cli.command,
            Command::Catalog {
                customer_id: Some("c-2".into())
            }
        );
    }

    #[test]
    fn test_parse_help_and_errors() {
        assert!(parse_args(&args(&[])).unwrap().is_none());
        assert!(parse_args(&args(&["health", "-h"])).unwrap().is_none());
        assert!(parse_args(&args(&["frobnicate"])).is_err());
        assert!(parse_args(&args(&["--config"])).is_err());
    }
}
