use anyhow::Result;
use clap::{CommandFactory, Parser};

use taxbox::cli::{run, send_notice, CliContext, CommandResult, Commands, Outcome};
use taxbox::config::paths::TaxboxPaths;
use taxbox::error::TaxboxResult;
use taxbox::logging::init_logging;
use taxbox::storage::Storage;

#[derive(Parser)]
#[command(
    name = "taxbox",
    author = "Kaylee Beyene",
    version,
    about = "Accounting document boxes for Thai SMEs and accounting firms",
    long_about = "taxbox keeps the source documents of each transaction in a box, \
                  tracks VAT and withholding tax, moves boxes through review with \
                  your accountant or accounting firm, and exports completed work \
                  to PEAK, FlowAccount, Express or a generic spreadsheet."
)]
struct Cli {
    /// Act as this user (e-mail); defaults to the configured default user
    #[arg(short, long, global = true, env = "TAXBOX_USER")]
    user: Option<String>,

    /// Organization to work in (name or ID)
    #[arg(long, global = true, env = "TAXBOX_ORG")]
    org: Option<String>,

    /// Print the result as a JSON object
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Open the store, run the command and send its notification
fn execute(user: Option<String>, org: Option<String>, command: Commands) -> TaxboxResult<Outcome> {
    let storage = Storage::open(TaxboxPaths::new()?)?;
    let ctx = CliContext::new(&storage, user, org);
    let outcome = run(&ctx, command)?;

    if let Some(notice) = &outcome.notice {
        match send_notice(&storage, notice) {
            Ok(report) => {
                for failure in &report.failures {
                    eprintln!("warning: notification to {} failed: {}", failure.name, failure.error);
                }
            }
            Err(e) => eprintln!("warning: notifications not sent: {}", e),
        }
    }
    Ok(outcome)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json)?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        println!("Run 'taxbox init --email <EMAIL>' to get started.");
        return Ok(());
    };

    match execute(cli.user, cli.org, command) {
        Ok(outcome) => {
            if cli.json {
                let result = CommandResult::ok(outcome.data);
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", outcome.text);
            }
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&CommandResult::failed(&e))?);
            } else {
                eprintln!("Error: {}", e);
            }
            std::process::exit(1);
        }
    }
}
