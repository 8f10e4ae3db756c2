use clap::{Args, Parser, Subcommand};
use colored::*;

mod logging;
mod playground;
mod runner;

#[derive(Parser)]
#[command(name = "ss")]
#[command(about = "Lex and parse SmartScript documents")]
#[command(version = "0.1.0")]
struct Ss {
    /// print parser debug events to stderr
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Lex(LexArgs),
    Parse(ParseArgs),
    Playground(PlaygroundArgs),
}

/// Print the token stream of a document
#[derive(Args)]
pub struct LexArgs {
    /// document path, `-` reads stdin
    file: String,
}

/// Parse a document and print its canonical form
#[derive(Args)]
pub struct ParseArgs {
    /// document path, `-` reads stdin
    file: String,

    /// print the tree outline instead of the canonical text
    #[arg(long, default_value_t = false)]
    tree: bool,

    /// close FOR blocks left open at end of input
    #[arg(long, default_value_t = false)]
    allow_unclosed: bool,
}

/// Interactive shell for trying out documents
#[derive(Args)]
pub struct PlaygroundArgs {}

pub fn main() {
    let cli = Ss::parse();
    logging::configure(cli.verbose);

    let result = match &cli.command {
        Commands::Lex(args) => runner::lex(args),
        Commands::Parse(args) => runner::parse(args),
        Commands::Playground(_args) => playground::playground_main(),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "[ss] Failed:".red().bold(), e);
        std::process::exit(1);
    }
}
