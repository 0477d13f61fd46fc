use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sprachtutor::cli::output::{self, OutputFormat};
use sprachtutor::config::{Overrides, PRESETS};
use sprachtutor::grammar::rules;
use sprachtutor::{AnalysisOptions, Category, Config, Difficulty, GermanAnalyzer};
use std::io;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sprachtutor")]
#[command(version, about = "German grammar feedback CLI", long_about = None)]
struct Cli {
    /// Configuration preset (grammar-only, fast, default)
    #[arg(short, long, global = true)]
    preset: Option<String>,

    /// Learner level (beginner, intermediate, advanced)
    #[arg(short, long, global = true)]
    difficulty: Option<Difficulty>,

    /// LanguageTool server URL
    #[arg(long, global = true, env = "SPRACHTUTOR_LANGUAGETOOL_URL")]
    server: Option<String>,

    /// Language model server URL
    #[arg(long, global = true, env = "SPRACHTUTOR_MODEL_URL")]
    model_url: Option<String>,

    /// Language model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Output format (text, json)
    #[arg(short = 'o', long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Generate shell completion script
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect to the services and remember the preset
    Init {
        /// Preset to use (grammar-only, fast, default)
        preset: Option<String>,
    },
    /// Check German text
    Check {
        /// Text to check
        #[arg(required = true)]
        text: Vec<String>,

        /// Full analysis with buckets, explanations and recommendations
        #[arg(long)]
        full: bool,

        /// Report each error with its position
        #[arg(long, conflicts_with = "full")]
        sentence: bool,

        /// Only keep these categories (e.g. GRAMMAR, TYPOS)
        #[arg(long, value_name = "CATEGORY")]
        focus: Vec<String>,

        /// Skip generated examples
        #[arg(long)]
        no_examples: bool,

        /// Also generate exercises
        #[arg(long)]
        exercises: bool,
    },
    /// Correct text and explain every correction
    Correct {
        /// Text to correct
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Explain a grammar topic
    Explain {
        /// Grammar topic, e.g. "Dativ"
        #[arg(required = true)]
        topic: Vec<String>,
    },
    /// Build a learning session over several topics
    Session {
        /// Topics, in the order they should be covered
        #[arg(required = true)]
        topics: Vec<String>,
    },
    /// Explain a LanguageTool rule id
    Rule {
        /// Rule id, e.g. CASE_AGREEMENT
        rule_id: String,
    },
    /// Show configuration and service status
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Handle shell completion generation
    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "sprachtutor", &mut io::stdout());
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut overrides = Overrides {
        preset: cli.preset.clone(),
        difficulty: cli.difficulty,
        server_url: cli.server.clone(),
        model_url: cli.model_url.clone(),
        model: cli.model.clone(),
    };
    if let Commands::Init { preset: Some(preset) } = &command {
        if !PRESETS.contains(&preset.as_str()) {
            anyhow::bail!(
                "Unknown preset '{}'. Available presets: {}",
                preset,
                PRESETS.join(", ")
            );
        }
        overrides.preset = Some(preset.clone());
    }

    match command {
        Commands::Rule { rule_id } => {
            let rule = rules::explain(&rule_id);
            match cli.format {
                OutputFormat::Json => output::print_json(&rule)?,
                OutputFormat::Text => output::print_rule(&rule),
            }
            Ok(())
        }
        Commands::Init { .. } => init(Config::load(overrides)?, cli.format),
        Commands::Status => status(Config::load(overrides)?, cli.format),
        command => {
            let config = Config::load(overrides)?;
            let analyzer = open_analyzer(&config, cli.format);
            run(&analyzer, command, cli.format)
        }
    }
}

fn init(config: Config, format: OutputFormat) -> Result<()> {
    let analyzer = open_analyzer(&config, format);
    let saved = Config::save_active_preset(&config.preset)?;
    tracing::debug!(path = %saved.display(), "active preset saved");

    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "command": "init",
            "success": true,
            "preset": config.preset,
            "info": analyzer.info(),
        }))?,
        OutputFormat::Text => output::print_ready(&config.preset),
    }
    Ok(())
}

fn status(config: Config, format: OutputFormat) -> Result<()> {
    let mut analyzer = GermanAnalyzer::from_config(&config);
    let init_error = analyzer.initialize().err();

    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "initialized": init_error.is_none(),
            "error": init_error.as_ref().map(|e| e.to_string()),
            "info": analyzer.info(),
        }))?,
        OutputFormat::Text => {
            output::print_status(&analyzer.info());
            if let Some(error) = &init_error {
                output::print_not_ready(error);
            }
        }
    }
    Ok(())
}

/// Initialize the analyzer or exit with a "not ready" message.
fn open_analyzer(config: &Config, format: OutputFormat) -> GermanAnalyzer {
    let mut analyzer = GermanAnalyzer::from_config(config);

    let spinner = output::Spinner::start(
        "Initializing German Language Analyzer...",
        format == OutputFormat::Text,
    );
    let result = analyzer.initialize();
    // process::exit below skips destructors.
    spinner.clear();

    if let Err(error) = result {
        output::print_not_ready(&error);
        std::process::exit(1);
    }
    analyzer
}

fn join_args(args: &[String]) -> String {
    args.join(" ")
        .trim_matches(|c| c == '\'' || c == '"')
        .to_string()
}

fn run(analyzer: &GermanAnalyzer, command: Commands, format: OutputFormat) -> Result<()> {
    let spinner = output::Spinner::start(
        "Working...",
        format == OutputFormat::Text && analyzer.has_generator(),
    );

    match command {
        Commands::Check {
            text,
            full,
            sentence,
            focus,
            no_examples,
            exercises,
        } => {
            let text = join_args(&text);
            if full {
                let options = AnalysisOptions {
                    explanations: true,
                    examples: no_examples.then_some(false),
                    exercises: exercises.then_some(true),
                };
                let result = analyzer.analyze(&text, options)?;
                spinner.clear();
                match format {
                    OutputFormat::Json => output::print_json(&result)?,
                    OutputFormat::Text => output::print_analysis(&result),
                }
            } else if sentence {
                let result = analyzer.check_sentence(&text)?;
                spinner.clear();
                match format {
                    OutputFormat::Json => output::print_json(&result)?,
                    OutputFormat::Text => output::print_sentence_check(&result),
                }
            } else if !focus.is_empty() {
                let focus: Vec<Category> = focus
                    .iter()
                    .map(|c| Category::from_id(&c.to_uppercase()))
                    .collect();
                let result = analyzer.check_text(&text, &focus)?;
                spinner.clear();
                match format {
                    OutputFormat::Json => output::print_json(&result)?,
                    OutputFormat::Text => {
                        println!("{}", output::highlight(&result.text, &result.spans));
                        println!("{}", result.corrected_text);
                    }
                }
            } else {
                let result = analyzer.quick_check(&text)?;
                spinner.clear();
                match format {
                    OutputFormat::Json => output::print_json(&result)?,
                    OutputFormat::Text => output::print_quick_check(&result),
                }
            }
        }
        Commands::Correct { text } => {
            let result = analyzer.correct_with_explanation(&join_args(&text))?;
            spinner.clear();
            match format {
                OutputFormat::Json => output::print_json(&result)?,
                OutputFormat::Text => output::print_correction_report(&result),
            }
        }
        Commands::Explain { topic } => {
            let result = analyzer.explain_topic(&join_args(&topic), None)?;
            spinner.clear();
            match format {
                OutputFormat::Json => output::print_json(&result)?,
                OutputFormat::Text => output::print_topic(&result),
            }
        }
        Commands::Session { topics } => {
            let result = analyzer.learning_session(&topics, None)?;
            spinner.clear();
            match format {
                OutputFormat::Json => output::print_json(&result)?,
                OutputFormat::Text => output::print_session(&result),
            }
        }
        Commands::Init { .. } | Commands::Status | Commands::Rule { .. } => {}
    }
    Ok(())
}
