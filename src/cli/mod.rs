// CLI module
// Argument parsing for the ledger and batch commands

mod args;

pub use args::{
    BatchArgs, CliArgs, Command, LedgerSource, StrategyType, TransferArgs, LEDGER_DIR_ENV,
};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

/// Parse command-line arguments and resolve the ledger they select
///
/// Invalid arguments, `--help`, `--version` and a missing ledger print
/// through clap and exit the process.
pub fn parse_args() -> (CliArgs, LedgerSource) {
    let args = CliArgs::parse();
    match args.ledger_source() {
        Some(source) => (args, source),
        None => CliArgs::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                format!("one of --ledger-dir, --fixture or {} is required", LEDGER_DIR_ENV),
            )
            .exit(),
    }
}
