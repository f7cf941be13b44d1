use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use llm_evaluator_core::{EvaluatorConfig, Example, LlmEvaluator, Run, StaticVariables};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "llm-evaluator")]
#[command(about = "Validate LLM evaluator configs, derive score schemas and render judge prompts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty, global = true)]
    format: OutputFormat,

    /// Output file (defaults to stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the structured-output score schema for an evaluator config
    Schema {
        /// Evaluator config file
        config: PathBuf,
    },

    /// Validate an evaluator config and print its template variables
    Check {
        /// Evaluator config file
        config: PathBuf,

        /// Variables supplied by a static mapper (key=value, repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Render the judge request for one run
    Render {
        /// Evaluator config file
        config: PathBuf,

        /// Run JSON file (inputs/outputs)
        #[arg(long)]
        run: PathBuf,

        /// Reference example JSON file
        #[arg(long)]
        example: Option<PathBuf>,

        /// Variables supplied by a static mapper (key=value, repeatable)
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Parse a model response into an evaluation result
    Parse {
        /// Evaluator config file
        config: PathBuf,

        /// Model response JSON file
        response: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing — logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Schema { config } => {
            let evaluator = build_evaluator(&config, Vec::new())?;
            write_json(evaluator.score_schema(), cli.output.as_ref(), cli.format)?;
        }
        Commands::Check { config, vars } => {
            let evaluator = build_evaluator(&config, vars)?;
            let bound: Vec<serde_json::Value> = evaluator
                .bound_variables()
                .iter()
                .map(|(name, source)| {
                    serde_json::json!({ "name": name, "source": source.to_string() })
                })
                .collect();
            let summary = serde_json::json!({
                "key": evaluator.score_config().key(),
                "input-variables": evaluator.input_variables(),
                "bound-variables": bound,
                "model": evaluator.model(),
            });
            write_json(&summary, cli.output.as_ref(), cli.format)?;
        }
        Commands::Render {
            config,
            run,
            example,
            vars,
        } => {
            let evaluator = build_evaluator(&config, vars)?;
            let run: Run = read_json(&run, "run")?;
            let example: Option<Example> = example
                .as_deref()
                .map(|path| read_json(path, "example"))
                .transpose()?;

            let request = evaluator
                .prepare(&run, example.as_ref())
                .map_err(|e| anyhow::Error::from(e).context("Rendering failed"))?;
            write_json(&request, cli.output.as_ref(), cli.format)?;
        }
        Commands::Parse { config, response } => {
            let evaluator = build_evaluator(&config, Vec::new())?;
            let response: serde_json::Value = read_json(&response, "model response")?;
            let result = evaluator
                .parse_response(&response)
                .map_err(|e| anyhow::Error::from(e).context("Response parsing failed"))?;
            write_json(&result, cli.output.as_ref(), cli.format)?;
        }
    }

    Ok(())
}

/// Load a config and construct the evaluator, attaching a static mapper when
/// `--var` values were given.
fn build_evaluator(path: &Path, vars: Vec<(String, String)>) -> Result<LlmEvaluator> {
    let config: EvaluatorConfig = read_json(path, "evaluator config")?;
    let evaluator = if vars.is_empty() {
        LlmEvaluator::new(config)
    } else {
        LlmEvaluator::with_mapper(config, vars.into_iter().collect::<StaticVariables>())
    };
    evaluator.map_err(|e| {
        let code = e.error_code();
        anyhow::Error::from(e).context(format!(
            "Invalid evaluator config {} ({})",
            path.display(),
            serde_json::to_string(&code).unwrap_or_default()
        ))
    })
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    let value = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))?;
    Ok(value)
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        if p.is_dir() {
            bail!("Output path is a directory: {}", p.display());
        }
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to flush output")?;

    Ok(())
}
