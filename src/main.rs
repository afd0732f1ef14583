use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use outline_ask::commands::{ask_question, index_docs, print_answer};
use outline_ask::config::{Config, RetrievalStrategy};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "outline-ask")]
#[command(about = "Ask questions about your Outline wiki, answered by Claude with cited sources")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Question to answer
    question: Vec<String>,

    /// Retrieval strategy, overriding the configured one
    #[arg(long, value_enum)]
    strategy: Option<RetrievalStrategy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vector store from every wiki document
    #[command(visible_alias = "index")]
    IndexDocs {
        /// Discard the existing store and reindex everything
        #[arg(short, long)]
        force: bool,
    },
}

enum Action {
    Index { force: bool },
    Ask(String),
}

impl Cli {
    fn question_text(&self) -> Option<String> {
        let question = self.question.join(" ");
        let question = question.trim();
        (!question.is_empty()).then(|| question.to_string())
    }

    /// What to do, or `None` when neither a subcommand nor a question was given
    fn action(&self) -> Option<Action> {
        match &self.command {
            Some(Commands::IndexDocs { force }) => Some(Action::Index { force: *force }),
            None => self.question_text().map(Action::Ask),
        }
    }
}

async fn run(action: Action, strategy: Option<RetrievalStrategy>) -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    match action {
        Action::Index { force } => {
            index_docs(&config, force)
                .await
                .context("Indexing failed")?;
        }
        Action::Ask(question) => {
            let answer = ask_question(&config, &question, strategy).await?;
            print_answer(&answer);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(action) = cli.action() else {
        eprintln!("{}", Cli::command().render_usage());
        eprintln!(
            "\nExamples:\n  outline-ask \"How do I request time off?\"\n  outline-ask index-docs --force"
        );
        return ExitCode::FAILURE;
    };

    match run(action, cli.strategy).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
