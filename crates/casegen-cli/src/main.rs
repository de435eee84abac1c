use casegen_core::coverage::CoverageAnalyzer;
use casegen_core::engine::DetailLevel;
use casegen_core::{
    format_test_cases, parse_response, Config, CoveragePolicy, FormatOptions, GenerationEngine,
    GenerationRequest, GenerationResponse, OutputFormat, TestCase, TestType,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "casegen")]
#[command(about = "Generate, parse and analyze test cases written by language models", long_about = None)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a model response into test cases
    Parse {
        /// File with the raw response (stdin when omitted)
        file: Option<PathBuf>,

        /// Output format: json, yaml, markdown or csv
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Leave provenance metadata out of the output
        #[arg(long)]
        no_metadata: bool,
    },
    /// Print a coverage report for a set of test cases
    Analyze {
        /// File with test cases in any supported format
        file: PathBuf,

        /// Requirements to check coverage against
        #[arg(short, long, value_delimiter = ',')]
        requirements: Vec<String>,

        /// JSON file with a coverage policy
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Earlier test set to compare against
        #[arg(long)]
        previous: Option<PathBuf>,
    },
    /// Generate test cases for a requirement
    Generate {
        /// Requirement text
        #[arg(required = true)]
        requirement: Vec<String>,

        /// Entity the requirement is about
        #[arg(short, long, default_value = "feature")]
        entity_type: String,

        /// Number of test cases to request
        #[arg(short, long, default_value_t = 5)]
        count: usize,

        /// Workflow the requirement belongs to
        #[arg(short, long)]
        workflow: Option<String>,

        /// Test types to focus on, comma separated
        #[arg(short, long, value_delimiter = ',')]
        types: Vec<String>,

        /// Detail level: low, medium or high
        #[arg(short, long, default_value = "medium")]
        detail: String,

        /// Skip edge cases
        #[arg(long)]
        no_edge_cases: bool,

        /// Skip negative tests
        #[arg(long)]
        no_negative: bool,
    },
    /// Rewrite existing test cases according to feedback
    Refine {
        /// File with test cases in any supported format
        file: PathBuf,

        /// What should change
        #[arg(short, long, required = true)]
        feedback: String,
    },
    /// Generate test cases for requirements an existing set misses
    FillGaps {
        /// File with test cases in any supported format
        file: PathBuf,

        /// Requirements the set should cover
        #[arg(short, long, value_delimiter = ',', required = true)]
        requirements: Vec<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Parse {
            file,
            format,
            no_metadata,
        } => {
            let raw = read_input(file.as_deref())?;
            let outcome = parse_response(&raw);
            for warning in &outcome.warnings {
                warn!("{}", warning);
            }
            debug!(format = %outcome.format, count = outcome.test_cases.len(), "Parsed response");

            let format: OutputFormat = format.parse()?;
            let options = FormatOptions {
                include_metadata: !no_metadata,
            };
            println!("{}", format_test_cases(&outcome.test_cases, format, options)?);
        }
        Commands::Analyze {
            file,
            requirements,
            policy,
            previous,
        } => {
            let config = Config::load()?;
            let analyzer = CoverageAnalyzer::new(config.coverage);
            let tests = read_test_cases(&file)?;

            let policy = match policy {
                Some(path) => Some(
                    CoveragePolicy::from_json(&read_input(Some(&path))?)
                        .wrap_err_with(|| format!("Invalid coverage policy in {}", path.display()))?,
                ),
                None => None,
            };
            let requirements = (!requirements.is_empty()).then_some(requirements.as_slice());

            let report = analyzer.analyze(&tests, requirements, policy.as_ref());
            eprintln!("{}", report.summary());
            println!("{}", serde_json::to_string_pretty(&report)?);

            if let Some(previous) = previous {
                let earlier = read_test_cases(&previous)?;
                let delta = analyzer.compare(&tests, &earlier);
                println!("{}", serde_json::to_string_pretty(&delta)?);
            }
        }
        Commands::Generate {
            requirement,
            entity_type,
            count,
            workflow,
            types,
            detail,
            no_edge_cases,
            no_negative,
        } => {
            let detail_level = DetailLevel::parse(&detail)
                .ok_or_else(|| eyre!("Unknown detail level: {} (expected low, medium or high)", detail))?;

            let mut request = GenerationRequest::new(requirement.join(" "), entity_type)
                .with_count(count)
                .with_detail_level(detail_level)
                .with_test_types(types.iter().map(|t| TestType::parse(t)).collect());
            if let Some(workflow) = workflow {
                request = request.with_workflow(workflow);
            }
            request.include_edge_cases = !no_edge_cases;
            request.include_negative_tests = !no_negative;

            let engine = build_engine()?;
            let spinner = spinner("Generating test cases...");
            let response = engine.generate(request).await;
            spinner.finish_and_clear();
            print_response(&response)?;
        }
        Commands::Refine { file, feedback } => {
            let tests = read_test_cases(&file)?;
            let engine = build_engine()?;
            let spinner = spinner("Refining test cases...");
            let response = engine.refine(&tests, &feedback).await;
            spinner.finish_and_clear();
            print_response(&response)?;
        }
        Commands::FillGaps { file, requirements } => {
            let tests = read_test_cases(&file)?;
            let engine = build_engine()?;
            let spinner = spinner("Filling coverage gaps...");
            let response = engine.fill_gaps(&requirements, &tests).await;
            spinner.finish_and_clear();
            print_response(&response)?;
        }
        Commands::Config => {
            let config = Config::load()?;
            print!("{}", config.to_toml_string());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "warn" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_engine() -> Result<GenerationEngine> {
    let config = Config::load()?;
    GenerationEngine::from_config(&config).wrap_err("Failed to set up the language model client")
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Reads a test case file through the response parser, so any output
/// format this tool writes (apart from CSV) can be read back.
fn read_test_cases(path: &Path) -> Result<Vec<TestCase>> {
    let raw = read_input(Some(path))?;
    if raw.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    let outcome = parse_response(&raw);
    if outcome.used_fallback {
        bail!("No test cases found in {}", path.display());
    }
    for warning in &outcome.warnings {
        warn!(file = %path.display(), "{}", warning);
    }
    Ok(outcome.test_cases)
}

fn print_response(response: &GenerationResponse) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    if !response.success {
        bail!(
            "{}",
            response.error.as_deref().unwrap_or("Generation failed")
        );
    }
    Ok(())
}
