//! Covenant CLI

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use covenant::rules::RULES;
use covenant::stubs::StubsManager;
use covenant::{Checker, CheckerConfig, Diagnostic, Module};

#[derive(Parser)]
#[command(name = "covenant", version, about = "Covenant - static contract checker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Check parsed modules (JSON) for contract violations
    Check {
        /// Module files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stub files declaring exceptions of external functions (JSON)
        #[arg(long)]
        stubs: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
        /// Source file to render diagnostics against (single module only)
        #[arg(long)]
        source: Option<PathBuf>,
        /// Verbose output, including why checks were skipped
        #[arg(short, long)]
        verbose: bool,
    },
    /// List the rules and their codes
    Rules,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check {
            files,
            config,
            stubs,
            format,
            source,
            verbose,
        } => check_files(&files, config.as_deref(), &stubs, format, source.as_deref(), verbose),
        Command::Rules => {
            list_rules();
            Ok(0)
        }
    };

    match result {
        Ok(0) => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}

/// Log to stderr: warnings always, abstention reasons under `--verbose`
fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init()
        .ok();
}

fn load_module(path: &Path) -> Result<Module, Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let mut module: Module = serde_json::from_str(&json)?;
    if module.path.is_none() {
        module.path = Some(path.display().to_string());
    }
    Ok(module)
}

/// Returns the number of diagnostics emitted
fn check_files(
    files: &[PathBuf],
    config: Option<&Path>,
    stub_files: &[PathBuf],
    format: Format,
    source: Option<&Path>,
    verbose: bool,
) -> Result<usize, Box<dyn std::error::Error>> {
    init_logging(verbose);

    let config = match config {
        Some(path) => CheckerConfig::load(path)?,
        None => CheckerConfig::default(),
    };

    let mut stubs = StubsManager::new();
    for path in stub_files {
        stubs.load(path)?;
    }

    if verbose {
        let solver = config.solver();
        if solver.is_available() {
            eprintln!("Using solver {} (timeout {}s)", solver.path(), solver.timeout());
        } else {
            eprintln!("Warning: solver `{}` not found, postconditions will not be verified", solver.path());
        }
        if !stubs.is_empty() {
            eprintln!("Loaded {} stub(s)", stubs.len());
        }
    }

    let modules = files
        .iter()
        .map(|path| load_module(path))
        .collect::<Result<Vec<_>, _>>()?;

    let checker = Checker::new(config);
    let stub_provider = (!stubs.is_empty()).then_some(&stubs as &dyn covenant::stubs::StubProvider);
    let results = checker.check_modules(&modules, stub_provider);

    let total: usize = results.iter().map(Vec::len).sum();
    match format {
        Format::Text => print_text(&modules, &results, source)?,
        Format::Json => print_json(&modules, &results)?,
    }

    if verbose {
        eprintln!("Checked {} module(s), {} diagnostic(s)", modules.len(), total);
    }
    Ok(total)
}

fn print_text(
    modules: &[Module],
    results: &[Vec<Diagnostic>],
    source: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source_text = match source {
        Some(path) => Some((path.display().to_string(), std::fs::read_to_string(path)?)),
        None => None,
    };

    for (module, diagnostics) in modules.iter().zip(results) {
        let path = module.path.as_deref().unwrap_or("<module>");
        for diag in diagnostics {
            match &source_text {
                Some((filename, text)) if modules.len() == 1 => {
                    covenant::error::report_diagnostic(filename, text, diag)?;
                }
                _ => println!("{}:{}", path, diag),
            }
        }
    }
    Ok(())
}

fn print_json(modules: &[Module], results: &[Vec<Diagnostic>]) -> Result<(), Box<dyn std::error::Error>> {
    #[derive(serde::Serialize)]
    struct Entry<'a> {
        path: &'a str,
        #[serde(flatten)]
        diagnostic: &'a Diagnostic,
    }

    let entries: Vec<Entry<'_>> = modules
        .iter()
        .zip(results)
        .flat_map(|(module, diagnostics)| {
            let path = module.path.as_deref().unwrap_or("<module>");
            diagnostics.iter().map(move |diagnostic| Entry { path, diagnostic })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn list_rules() {
    for rule in RULES {
        println!("{:>3}  {:<6}  {}", rule.code(), rule.required().to_string(), rule.message());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_logging_shows_abstentions() {
        init_logging(true);
        assert!(tracing::enabled!(tracing::Level::DEBUG));
        assert!(!tracing::enabled!(tracing::Level::TRACE));
    }
}
