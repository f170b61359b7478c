// SPDX-License-Identifier: MIT OR Apache-2.0
//! `charmap-diagram` - headless host for Charmap diagrams.
//!
//! Loads a saved diagram, binds host values from a RON config and
//! evaluates it:
//! - `run` evaluates once and prints outputs, errors and the return value
//! - `check` validates statement syntax without evaluating
//! - `fmt` rewrites a diagram in normalized form
//! - `watch` re-evaluates on every save
//! - `init-config` writes a default config file

mod bindings;
mod config;
mod error;
mod file_watcher;
mod report;
mod watch;

use charmap_diagram::{check_statement, evaluate_diagram, load_diagram, save_diagram, Diagram, ReturnExecutor};
use clap::{Parser as ClapParser, Subcommand};
use config::{RunnerConfig, CONFIG_FILE_NAME};
use error::RunnerError;
use report::RunReport;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "charmap-diagram")]
#[command(version, about = "Evaluate Charmap dataflow diagrams")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a diagram once
    Run {
        /// Path to the saved diagram
        file: PathBuf,
        /// Config file (defaults to charmap.ron next to the diagram)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Required type of the returned value
        #[arg(long)]
        expect: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check statement syntax without evaluating
    Check {
        /// Path to the saved diagram
        file: PathBuf,
    },
    /// Rewrite a diagram in normalized form
    Fmt {
        /// Path to the saved diagram
        file: PathBuf,
        /// Overwrite the file instead of printing
        #[arg(long)]
        write: bool,
    },
    /// Re-evaluate a diagram whenever it changes
    Watch {
        /// Path to the saved diagram
        file: PathBuf,
        /// Config file (defaults to charmap.ron next to the diagram)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Required type of the returned value
        #[arg(long)]
        expect: Option<String>,
    },
    /// Write a default config file
    InitConfig {
        /// Destination path
        #[arg(default_value = CONFIG_FILE_NAME)]
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("charmap_runner=info,charmap_diagram=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            file,
            config,
            expect,
            json,
        } => run(&file, config.as_deref(), expect, json),
        Commands::Check { file } => check(&file),
        Commands::Fmt { file, write } => fmt(&file, write),
        Commands::Watch {
            file,
            config,
            expect,
        } => RunnerConfig::resolve(config.as_deref(), &file)
            .and_then(|config| watch::watch(&file, &config, expect))
            .map(|()| ExitCode::SUCCESS),
        Commands::InitConfig { path } => RunnerConfig::default().save(&path).map(|()| {
            tracing::info!("Wrote {}", path.display());
            ExitCode::SUCCESS
        }),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Read and parse a saved diagram
pub(crate) fn read_diagram(path: &Path) -> Result<Diagram, RunnerError> {
    let content = std::fs::read_to_string(path).map_err(|source| RunnerError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load_diagram(&content).map_err(|source| RunnerError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Executor enforcing `expect` when given
pub(crate) fn executor_for(expect: Option<String>) -> ReturnExecutor {
    match expect {
        Some(type_name) => ReturnExecutor::expecting(type_name),
        None => ReturnExecutor::new(),
    }
}

fn run(
    file: &Path,
    config: Option<&Path>,
    expect: Option<String>,
    json: bool,
) -> Result<ExitCode, RunnerError> {
    let config = RunnerConfig::resolve(config, file)?;
    let diagram = read_diagram(file)?;
    let root = bindings::build_environment(&config);

    let expect = expect.or_else(|| config.expected_return_type.clone());
    let return_required = expect.is_some();
    let mut executor = executor_for(expect);

    let state = evaluate_diagram(&diagram, &root, &mut executor);
    let report = RunReport::from_state(&state).with_executor(&executor);
    if json {
        println!("{}", report.to_json()?);
    } else {
        print!("{report}");
    }

    if return_required && report.return_value.is_none() {
        tracing::error!("No value of the expected type was returned");
        return Ok(ExitCode::FAILURE);
    }
    Ok(if report.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn check(file: &Path) -> Result<ExitCode, RunnerError> {
    let diagram = read_diagram(file)?;
    let mut failures = 0;

    for (index, node) in diagram.existing_nodes() {
        for statement in 0..node.statements().len() {
            let text = node.statement_text(statement);
            if text.trim().is_empty() {
                continue;
            }
            if let Err(err) = check_statement(&text) {
                let line = node.statement_line_range(statement).start + 1;
                println!("{}: node {}, line {line}: {err}", file.display(), index + 1);
                failures += 1;
            }
        }
    }

    if failures == 0 {
        tracing::info!("{}: {} node(s) ok", file.display(), diagram.node_count());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn fmt(file: &Path, write: bool) -> Result<ExitCode, RunnerError> {
    let text = save_diagram(&read_diagram(file)?);
    if write {
        std::fs::write(file, text).map_err(|source| RunnerError::Write {
            path: file.to_path_buf(),
            source,
        })?;
        tracing::info!("Formatted {}", file.display());
    } else {
        print!("{text}");
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("charmap-runner-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_exit_codes() {
        let ok = temp_file("ok.diagram", "diagram {\n node { id: 1 line: \"return [1, 2]\" }\n}\n");
        assert_eq!(run(&ok, None, None, false).unwrap(), ExitCode::SUCCESS);
        assert_eq!(
            run(&ok, None, Some("float".into()), true).unwrap(),
            ExitCode::FAILURE
        );

        let failing = temp_file("failing.diagram", "diagram { node { id: 1 line: \"(1\" } }");
        assert_eq!(run(&failing, None, None, false).unwrap(), ExitCode::FAILURE);
    }

    #[test]
    fn test_check_and_fmt() {
        let file = temp_file(
            "check.diagram",
            "diagram { node { id: 2 line: \"x = $\" line: \"show(x\" } }",
        );
        assert_eq!(check(&file).unwrap(), ExitCode::FAILURE);
        assert_eq!(fmt(&file, true).unwrap(), ExitCode::SUCCESS);

        let formatted = std::fs::read_to_string(&file).unwrap();
        assert!(formatted.starts_with("diagram {\n  node {\n    id: 2\n"));
        assert_eq!(read_diagram(&file).unwrap().node_count(), 1);
    }

    #[test]
    fn test_missing_file() {
        let missing = std::env::temp_dir().join("charmap-runner-missing.diagram");
        assert!(matches!(read_diagram(&missing), Err(RunnerError::Read { .. })));
    }
}
