use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use liskov::common::{AstCache, ClassIndex};
use liskov::config::Config;
use liskov::review::{audit, default_checkers};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "liskov")]
#[command(about = "Liskov contract auditor for PHP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check classes against the interfaces and parents they extend
    Check {
        /// Files or directories to scan
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Maximum depth of followed calls
        #[arg(long, value_name = "N")]
        max_depth: Option<usize>,

        /// Ignore exceptions caught by an enclosing catch clause
        #[arg(long)]
        honor_catch: bool,
    },

    /// Parse a PHP file and show its declarations
    Parse {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show the full syntax tree
        #[arg(short, long)]
        detailed: bool,
    },

    /// Lexically analyze a PHP file
    Lex {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Show token locations
        #[arg(short, long)]
        locations: bool,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Check { paths, max_depth, honor_catch } => check(paths, *max_depth, *honor_catch),
        Commands::Parse { input, detailed } => {
            parse_file(input, *detailed)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lex { input, locations } => {
            lex_file(input, *locations)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check(paths: &[PathBuf], max_depth: Option<usize>, honor_catch: bool) -> Result<ExitCode> {
    let mut config = Config::from_env()?;
    if let Some(depth) = max_depth {
        if depth == 0 {
            bail!("--max-depth must be at least 1");
        }
        config = config.with_max_call_depth(depth);
    }
    if honor_catch {
        config = config.with_honor_catch_blocks(true);
    }

    let files = collect_sources(paths, &config)?;
    if files.is_empty() {
        bail!("no source files found");
    }

    let cache = AstCache::filesystem();
    let index = ClassIndex::build(&files, &cache);
    let report = audit(&index, &cache, &config, &default_checkers());

    for violation in &report.violations {
        println!("{}", violation);
    }
    for error in &report.load_errors {
        eprintln!("could not check: {}", error);
    }
    for file in index.unparsed_files() {
        eprintln!("could not parse: {}", file.display());
    }
    println!(
        "{} classes checked, {} violation(s)",
        report.checked,
        report.violations.len()
    );

    Ok(if report.has_violations() { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn collect_sources(paths: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.exists() {
            bail!("{} does not exist", path.display());
        }
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && config.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }
    Ok(files)
}

fn parse_file(input: &Path, detailed: bool) -> Result<()> {
    let source = fs::read_to_string(input)?;
    let mut ast = liskov::parser::parse_php(&source)?;
    liskov::common::resolve_names(&mut ast);

    if detailed {
        println!("{:#?}", ast);
        return Ok(());
    }
    for decl in ast.types() {
        println!("{}", decl);
        for method in &decl.methods {
            println!("    {}", method);
        }
    }
    Ok(())
}

fn lex_file(input: &Path, locations: bool) -> Result<()> {
    let source = fs::read_to_string(input)?;
    let lexer = liskov::parser::Lexer::new(&source);
    let tokens = lexer.tokenize().map_err(|e| anyhow::anyhow!("Lexical error: {}", e))?;

    for token in tokens {
        if locations {
            println!("{:?} at {}:{}", token.token_type(), token.location().line, token.location().column);
        } else {
            println!("{:?}: '{}'", token.token_type(), token.lexeme());
        }
    }
    Ok(())
}
