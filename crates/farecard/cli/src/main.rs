use clap::{Parser, Subcommand};
use farecard_apdu_transport_pcsc::PcscDeviceManager;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod utils;

use commands::*;
use utils::reader;

#[derive(Parser)]
#[command(version, about = "Dump contactless transit cards through a PC/SC reader")]
struct Cli {
    /// Debug level output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    List,

    /// Read the card on a reader
    Dump {
        /// Reader to use. Without it, the only reader holding a card that is
        /// not a security key is picked, eg: -r "ACS ACR122U"
        #[arg(short, long, value_name = "DEVICE")]
        reader: Option<String>,

        /// Emit raw APDU traces
        #[arg(short, long)]
        trace: bool,

        /// Do not ask the reader for the card UID (needed for contact readers)
        #[arg(short = 'U', long)]
        no_uid: bool,

        /// Do not print a summary of the card
        #[arg(short = 'P', long)]
        no_parse: bool,

        /// A file that does not exist yet, or an existing directory to create
        /// a dump with a generated name in
        #[arg(short, long, value_name = "FILE_OR_DIR")]
        output: Option<PathBuf>,

        /// MIFARE Classic keys, as JSON
        #[arg(long, value_name = "FILE")]
        keys: Option<PathBuf>,

        /// Extra ISO 7816 application to select, in hex
        #[arg(long = "aid", value_name = "HEX")]
        aids: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let trace = matches!(cli.command, Commands::Dump { trace: true, .. });
    setup_logging(cli.verbose, trace);

    let manager = PcscDeviceManager::new()?;

    match cli.command {
        Commands::List => reader::list_readers(&manager)?,
        Commands::Dump {
            reader,
            trace: _,
            no_uid,
            no_parse,
            output,
            keys,
            aids,
        } => dump_command(
            &manager,
            DumpOptions {
                reader,
                no_uid,
                no_parse,
                output,
                keys,
                aids,
            },
        )?,
    }

    Ok(())
}

fn setup_logging(verbose: bool, trace: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    if trace {
        // Raw APDUs are logged by the transport layer
        for directive in ["farecard_apdu_core=trace", "farecard_apdu_transport_pcsc=trace"] {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .init();
}
