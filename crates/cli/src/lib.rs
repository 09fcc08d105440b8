pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "warung",
    about = "Warung operator CLI",
    long_about = "Operate the Warung storefront: migrations, catalog seeding, config inspection, and readiness checks.",
    after_help = "Examples:\n  warung doctor --json\n  warung config\n  warung seed --catalog data/products.json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Replace the product catalog with the products in a JSON file")]
    Seed {
        #[arg(long, value_name = "FILE", help = "JSON array of products, or an object with a `products` array")]
        catalog: PathBuf,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, chat bridge settings, and database readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed { catalog } => commands::seed::run(&catalog),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn seed_requires_catalog_path() {
        assert!(Cli::try_parse_from(["warung", "seed"]).is_err());

        let cli = Cli::try_parse_from(["warung", "seed", "--catalog", "data/products.json"])
            .expect("seed with catalog should parse");
        assert!(matches!(
            cli.command,
            Command::Seed { ref catalog } if catalog.ends_with("products.json")
        ));
    }

    #[test]
    fn doctor_json_flag_parses() {
        let cli = Cli::try_parse_from(["warung", "doctor", "--json"]).expect("doctor should parse");
        assert!(matches!(cli.command, Command::Doctor { json: true }));
    }
}
