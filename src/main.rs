use clap::{Parser as ClapParser, Subcommand};
use dotquery::cli::{self, CheckOptions, CheckResult, CliError};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "dotquery")]
#[command(about = "dotquery - evaluate dotted-path queries against JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and execute a query
    Check {
        /// The query to execute
        query: String,

        /// JSON object to use as context (reads from stdin if piped)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate syntax, don't execute
        #[arg(long)]
        syntax_only: bool,

        /// Fail on unknown names instead of treating them as null
        #[arg(long)]
        strict: bool,

        /// Maximum evaluation depth
        #[arg(long)]
        max_depth: Option<usize>,
    },

    /// Print the query in canonical, fully parenthesized form
    Ast {
        /// The query to parse
        query: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            query,
            input,
            pretty,
            syntax_only,
            strict,
            max_depth,
        } => run_check(CheckOptions {
            query,
            input,
            pretty,
            syntax_only,
            strict,
            max_depth,
        }),
        Commands::Ast { query } => cli::render_ast(&query).map(|rendered| println!("{}", rendered)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_check(mut options: CheckOptions) -> Result<(), CliError> {
    if options.input.is_none() && !options.syntax_only && !atty::is(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        if !buffer.trim().is_empty() {
            options.input = Some(buffer);
        }
    }

    match cli::execute_check(&options)? {
        CheckResult::SyntaxValid => println!("Syntax is valid"),
        CheckResult::Success(output) => {
            let json = if options.pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}
