//! scriptorium CLI - Research a topic and write a resumable course about it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scriptorium::{
    ChatGenerator, Collaborators, Config, ContentBudgeter, GitCli, LLMClient, Orchestrator,
    PipelineSettings, RunRequest, TavilySearch, TiktokenCounter,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "scriptorium")]
#[command(version)]
#[command(about = "Research a topic and write a resumable course about it")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate (or resume) a course
    Run {
        /// Course topic
        #[arg(short, long)]
        topic: String,

        /// Who the course is written for
        #[arg(short, long, default_value = "intermediate developers")]
        audience: String,

        /// Existing directory to create the course in, instead of the output dir
        #[arg(long)]
        repo_dir: Option<PathBuf>,
    },

    /// Validate configuration and credentials
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {path:?}")),
        None => Ok(Config::default()),
    }
}

fn print_example_config() {
    let example = r#"# scriptorium configuration file

[llm]
# OpenAI-compatible chat-completions endpoint
base_url = "https://api.openai.com/v1"
# api_key = "${MY_LLM_KEY}"   # or set LLM_API_KEY
api_key_env = "LLM_API_KEY"
timeout_secs = 180
max_retries = 3

[models]
notes = "gpt-4o"
writer = "claude-sonnet-4-20250514"

[search]
base_url = "https://api.tavily.com"
# api_key = "tvly-..."        # or set TAVILY_API_KEY
api_key_env = "TAVILY_API_KEY"
max_results = 5
search_depth = "advanced"

[generation]
notes_temperature = 0.7
synthesis_temperature = 1.0
lesson_temperature = 1.0
max_output_tokens = 16000
max_input_tokens = 50000    # budget for search results and research notes

[git]
user_name = "Teaching Agent"
user_email = "agent@example.com"
# remote_url = "git@github.com:me/courses.git"

[output]
dir = "outputs"
"#;
    println!("{example}");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(cli.config.as_deref())?;
            config
                .validate_credentials()
                .context("Failed to resolve credentials")?;

            info!("Configuration is valid");
            info!("  LLM endpoint: {}", config.llm.base_url);
            info!(
                "  Models: notes={}, writer={}",
                config.models.notes, config.models.writer
            );
            info!("  Output dir: {}", config.output.dir.display());
            if let Some(remote) = &config.git.remote_url {
                info!("  Push remote: {remote}");
            }
        }

        Commands::Run {
            topic,
            audience,
            repo_dir,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let credentials = config
                .validate_credentials()
                .context("Failed to resolve credentials")?;

            let llm = Arc::new(LLMClient::from_config(
                &config.llm,
                credentials.llm_api_key.clone(),
            )?);
            let note_taker = Arc::new(ChatGenerator::new(
                Arc::clone(&llm),
                config.models.notes.clone(),
            ));
            let author = Arc::new(ChatGenerator::new(
                Arc::clone(&llm),
                config.models.writer.clone(),
            ));
            info!(notes = note_taker.model(), writer = author.model(), "Using models");

            let collaborators = Collaborators {
                researcher: Arc::new(TavilySearch::new(
                    &config.search,
                    credentials.search_api_key.clone(),
                )?),
                note_taker,
                author,
                version_control: Arc::new(GitCli::new(&config.git)),
            };
            let budgeter = ContentBudgeter::new(Arc::new(
                TiktokenCounter::cl100k().context("Failed to load tokenizer")?,
            ));

            let orchestrator = Orchestrator::new(
                collaborators,
                PipelineSettings::from_config(&config),
                budgeter,
            );

            let mut request = RunRequest::new(topic, audience);
            request.repo_dir = repo_dir;
            let state = match orchestrator.run(&request).await {
                Ok(state) => state,
                Err(e) => {
                    if !e.is_configuration() {
                        warn!("Run stopped early; rerun the same topic to resume");
                    }
                    return Err(e.into());
                }
            };
            let (input_tokens, output_tokens) = llm.total_tokens();
            let words: usize = state
                .lesson_bodies()
                .map(|body| body.split_whitespace().count())
                .sum();

            println!("\n=== Course Complete ===");
            println!("Topic:       {}", state.topic);
            println!("Lessons:     {}", state.lesson_count());
            println!(
                "Written:     {} (reused {})",
                state.report.lessons_written, state.report.lessons_reused
            );
            println!("Words:       {words}");
            println!("Tokens:      {input_tokens} in / {output_tokens} out");
            println!("Namespace:   {}", state.namespace.display());
            println!("Published:   {}", state.publish_url);
            println!("\nOutline:");
            for (i, title) in state.lesson_outline.iter().enumerate() {
                println!("  {}. {title}", i + 1);
            }
        }
    }

    Ok(())
}
