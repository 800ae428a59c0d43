use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cre_parser::{Dialect, DialectParser, LexicalParser, ParsedSnippet};

mod logging;

/// Which dialect's parser, if any, to force before ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DialectChoice {
    /// Force the older dialect.
    D2,
    /// Force the newer dialect.
    D3,
    /// Run both and let the selector pick (spec.md §4.D).
    Auto,
}

/// Infer and resolve third-party package dependencies for a standalone
/// source snippet.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the snippet to analyze.
    snippet: PathBuf,

    /// Force a single dialect instead of running the selector.
    #[arg(long, value_enum)]
    dialect: Option<DialectChoice>,

    /// Path to a JSON knowledge-graph fixture (see `cre_kg::KgFixture`).
    /// Without this flag, an empty knowledge graph is used — every
    /// third-party import resolves to an unpinned, nameless candidate.
    #[arg(long)]
    kg: Option<PathBuf>,

    /// Print the output record as JSON instead of a human-readable summary.
    #[arg(long)]
    json: bool,

    /// Do not print any log output.
    #[arg(global = true, long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Use verbose log output.
    #[arg(global = true, long, short, conflicts_with = "quiet")]
    verbose: bool,
}

/// A parser that never parses — used to disable one side of the dialect
/// selector when `--dialect` forces the other.
struct NullParser(Dialect);

impl DialectParser for NullParser {
    fn dialect(&self) -> Dialect {
        self.0
    }

    fn parse(&self, _source: &str) -> Option<ParsedSnippet> {
        None
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::setup_logging(if cli.quiet {
        logging::Level::Quiet
    } else if cli.verbose {
        logging::Level::Verbose
    } else {
        logging::Level::Default
    })?;

    let source = fs::read_to_string(&cli.snippet)
        .with_context(|| format!("failed to read snippet at {}", cli.snippet.display()))?;

    let kg = match &cli.kg {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read knowledge-graph fixture at {}", path.display()))?;
            let fixture = cre_kg::KgFixture::from_json(&text)
                .with_context(|| format!("failed to parse knowledge-graph fixture at {}", path.display()))?;
            fixture.build()
        }
        None => cre_kg::memory::MemoryKgBuilder::new().build(),
    };

    let d2_real = LexicalParser::d2();
    let d3_real = LexicalParser::d3();
    let d2_null = NullParser(Dialect::D2);
    let d3_null = NullParser(Dialect::D3);

    let (d2, d3): (&dyn DialectParser, &dyn DialectParser) = match cli.dialect {
        None | Some(DialectChoice::Auto) => (&d2_real, &d3_real),
        Some(DialectChoice::D2) => (&d2_real, &d3_null),
        Some(DialectChoice::D3) => (&d2_null, &d3_real),
    };

    let output = cre_core::infer(&kg, &source, d2, d3).context("dependency inference failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_summary(&output);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_summary(output: &cre_core::InferOutput) {
    match output.dialect {
        Some(dialect) => println!("dialect: {dialect} ({})", output.interpreter_version.unwrap_or("unknown")),
        None => println!("dialect: none (snippet did not parse under either dialect)"),
    }
    println!("status: {:?}", output.status);
    match &output.install_pairs {
        Some(pairs) if pairs.is_empty() => println!("install plan: (empty)"),
        Some(pairs) => {
            println!("install plan:");
            for pair in pairs {
                match &pair.version {
                    Some(version) => println!("  {} == {version}", pair.package),
                    None => println!("  {} (no known versions)", pair.package),
                }
            }
        }
        None => println!("install plan: n/a"),
    }
    println!(
        "timings: parse={:?} match={:?} solving={:?}",
        output.timings.parse, output.timings.r#match, output.timings.solving
    );
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            let mut causes = err.chain();
            eprintln!("error: {}", causes.next().unwrap());
            for cause in causes {
                eprintln!("  caused by: {cause}");
            }
            ExitCode::FAILURE
        }
    }
}
