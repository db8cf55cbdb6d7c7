use anyhow::{Context, Result};
use clap::Parser;
use quarry::query::QueryNode;
use quarry::{BooleanOperator, QueryParser, QueryParserConfig};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "quarry")]
#[command(about = "Parse a Lucene-style query string and print its canonical form", long_about = None)]
struct Args {
    /// Query string to parse
    query: String,

    /// Default search field (repeatable)
    #[arg(long = "field", value_delimiter = ',')]
    fields: Vec<String>,

    /// Combine entries without an explicit operator with AND
    #[arg(long)]
    and: bool,

    /// Report syntax errors instead of falling back to a term query
    #[arg(long)]
    strict: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the lexeme stream instead of the parsed query
    #[arg(long)]
    lexemes: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => QueryParserConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => QueryParserConfig::default(),
    };
    if !args.fields.is_empty() {
        config = config.with_default_search_fields(args.fields.iter().cloned());
    }
    if args.and {
        config = config.with_default_operator(BooleanOperator::And);
    }
    if args.strict {
        config = config.with_suppress_exceptions(false);
    }

    debug!("quarry v{}", quarry::VERSION);
    let parser = QueryParser::new(config).context("invalid parser configuration")?;

    if args.lexemes {
        for lexeme in parser.tokenize(&args.query)? {
            println!("{}", lexeme);
        }
        return Ok(());
    }

    let outcome = parser
        .parse_detailed(&args.query)
        .with_context(|| format!("failed to parse query {:?}", args.query))?;
    if let Some(error) = &outcome.suppressed {
        warn!("{}; falling back to a term query", error);
    }

    info!(query_type = outcome.query.query_type(), "parsed");
    println!("{}", outcome.query);
    Ok(())
}
