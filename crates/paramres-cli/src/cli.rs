//! paramres CLI - resolve placeholders in configuration files
//!
//! Usage:
//!   paramres resolve config.yaml
//!   paramres resolve config.yaml --format json --env host=127.0.0.1
//!   paramres check config.yaml other.json

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use paramres_core::{Environment, Layered, ParamResolver, ResolverOptions, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// paramres - Resolve %placeholders% in configuration files
#[derive(Parser)]
#[command(name = "paramres")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a configuration file and print the result
    Resolve {
        /// Configuration file (YAML, or JSON when it ends in .json)
        file: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,

        /// Write to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        resolution: ResolutionArgs,
    },

    /// Check that configuration files resolve without errors
    Check {
        /// Configuration file(s) to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        resolution: ResolutionArgs,
    },
}

#[derive(clap::Args)]
struct ResolutionArgs {
    /// Set an environment variable for %env.NAME% placeholders (KEY=VALUE)
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    envs: Vec<(String, String)>,

    /// Maximum nesting and placeholder chain depth
    #[arg(long, default_value_t = paramres_core::resolver::DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

impl ResolutionArgs {
    /// `--env` overrides on top of the process environment
    fn environment(&self) -> Arc<dyn Environment> {
        let overrides: HashMap<String, String> = self.envs.iter().cloned().collect();
        Arc::new(Layered::over_process(overrides))
    }

    fn resolver_in(&self, env: &Arc<dyn Environment>) -> ParamResolver {
        ParamResolver::new()
            .with_shared_environment(Arc::clone(env))
            .with_options(ResolverOptions {
                max_depth: self.max_depth,
            })
    }

    fn resolver(&self) -> ParamResolver {
        self.resolver_in(&self.environment())
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Run the CLI with the process arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            file,
            format,
            output,
            resolution,
        } => cmd_resolve(&file, format, output, &resolution),

        Commands::Check { files, resolution } => cmd_check(&files, &resolution),
    }
}

/// Read a configuration file into a tree
pub fn load_tree(path: &Path) -> Result<Value, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?;

    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    if is_json {
        serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in {}: {}", path.display(), e))
    } else {
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Invalid YAML in {}: {}", path.display(), e))
    }
}

/// Render a resolved tree in the requested format
fn render(value: &Value, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
    }
}

fn cmd_resolve(
    file: &Path,
    format: OutputFormat,
    output: Option<PathBuf>,
    resolution: &ResolutionArgs,
) -> ExitCode {
    let tree = match load_tree(file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let resolved = match resolution.resolver().resolve_tree(tree) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{} {}\n", "✗".red(), file.display());
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    let content = match render(&resolved, format) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(2);
        }
    };

    if let Some(output_path) = output {
        if let Err(e) = std::fs::write(&output_path, &content) {
            eprintln!("{}: {}", "Error writing file".red(), e);
            return ExitCode::from(2);
        }
        eprintln!("{} Wrote to {}", "✓".green(), output_path.display());
    } else {
        print!("{}", content);
    }

    ExitCode::SUCCESS
}

fn cmd_check(files: &[PathBuf], resolution: &ResolutionArgs) -> ExitCode {
    let mut all_valid = true;
    let env = resolution.environment();

    for file in files {
        let tree = match load_tree(file) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("{} {}", "✗".red(), e);
                all_valid = false;
                continue;
            }
        };

        // one resolver per file: an instance only resolves once
        match resolution.resolver_in(&env).resolve_tree(tree) {
            Ok(_) => println!("{} {}: resolves", "✓".green(), file.display()),
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                all_valid = false;
            }
        }
    }

    if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
