//! A terminal front end for the research agent.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use research_agent::core::{FinalAnswer, RunEvent, TemplateSource};
use research_agent::{ResearchConfig, Session, SessionBuilder, SessionError};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::signal;
use tokio::sync::mpsc::{self, UnboundedReceiver};

const BAR_CHAR: &str = "▎";

/// Answers questions by searching the web.
#[derive(Debug, Parser)]
#[command(name = "research-agent", version, about)]
struct Cli {
    /// The question to research. Without it, questions are read from the
    /// prompt until EOF.
    query: Option<String>,

    /// Exa search API key.
    #[arg(long, env = "EXA_API_KEY", hide_env_values = true)]
    exa_api_key: Option<String>,

    /// Exa search API base URL.
    #[arg(long, env = "EXA_BASE_URL")]
    exa_base_url: Option<String>,

    /// OpenAI-compatible API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    /// Model name.
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// Maximum number of search turns per question.
    #[arg(long, env = "RESEARCH_MAX_TURNS", default_value_t = 10)]
    max_turns: usize,

    /// The language answers are written in.
    #[arg(long, env = "RESEARCH_LANGUAGE", default_value = "Chinese")]
    language: String,

    /// Instruction template file.
    #[arg(long, env = "RESEARCH_INSTRUCTIONS", value_name = "PATH")]
    instructions: Option<PathBuf>,

    /// Instruction template text.
    #[arg(long, value_name = "TEXT", conflicts_with = "instructions")]
    instructions_text: Option<String>,

    /// Time limit of one search, in seconds.
    #[arg(long, env = "RESEARCH_TOOL_TIMEOUT", default_value_t = 30)]
    tool_timeout_secs: u64,
}

impl Cli {
    fn into_config(self) -> ResearchConfig {
        let mut config = ResearchConfig::new(
            self.exa_api_key.unwrap_or_default(),
            self.openai_api_key.unwrap_or_default(),
        );
        config.exa_base_url = self.exa_base_url;
        config.openai_base_url = self.openai_base_url;
        config.model = self.model;
        config.max_turns = self.max_turns;
        config.output_language = self.language;
        config.tool_timeout = Duration::from_secs(self.tool_timeout_secs);
        if let Some(path) = self.instructions {
            config.instructions = TemplateSource::File(path);
        } else if let Some(text) = self.instructions_text {
            config.instructions = TemplateSource::Literal(text);
        }
        config
    }
}

enum Outcome {
    Answered,
    Failed,
    Cancelled,
    Fatal,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut cli = Cli::parse();
    let query = cli.query.take();
    let config = cli.into_config();

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = match SessionBuilder::from_config(&config) {
        Ok(builder) => builder
            .on_event(move |event| {
                event_tx.send(event.clone()).ok();
            })
            .build(),
        Err(err) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            return ExitCode::FAILURE;
        }
    };

    // Fail before the first question if the template cannot be loaded.
    if let Err(err) = session.instructions() {
        eprintln!("{} {err}", "error:".bright_red().bold());
        return ExitCode::FAILURE;
    }

    if let Some(query) = query {
        return match research(&session, &query, &mut event_rx).await {
            Outcome::Answered => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        };
    }

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let line = select! {
            line = read_line() => line,
            _ = signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if let Outcome::Fatal =
            research(&session, query, &mut event_rx).await
        {
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

async fn research(
    session: &Session,
    query: &str,
    events: &mut UnboundedReceiver<RunEvent>,
) -> Outcome {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(
        ProgressStyle::default_spinner().tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    progress_bar.set_message("🤔 Thinking...");
    progress_bar.enable_steady_tick(Duration::from_millis(100));

    // Dropping the run future on Ctrl-C aborts its searches.
    let result = {
        let mut run = pin!(session.run_once(query));
        let mut ctrl_c = pin!(signal::ctrl_c());
        loop {
            select! {
                result = &mut run => break Some(result),
                Some(event) = events.recv() => {
                    if let Some(message) = progress_message(&event) {
                        progress_bar.set_message(message);
                    }
                }
                _ = &mut ctrl_c => break None,
            }
        }
    };

    // Finish the progress bar before printing anything else.
    progress_bar.finish_and_clear();
    while events.try_recv().is_ok() {}

    match result {
        Some(Ok(answer)) => {
            print_answer(&answer);
            Outcome::Answered
        }
        Some(Err(err @ SessionError::Config(_))) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            Outcome::Fatal
        }
        Some(Err(err)) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            Outcome::Failed
        }
        None => {
            eprintln!("{}", "Cancelled.".bright_yellow());
            Outcome::Cancelled
        }
    }
}

fn progress_message(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::Thinking { turn } if *turn > 1 => {
            Some(format!("🤔 Thinking (turn {turn})..."))
        }
        RunEvent::Thinking { .. } => Some("🤔 Thinking...".to_owned()),
        RunEvent::SearchStarted { query, .. } => {
            Some(format!("🔍 Searching \"{query}\"..."))
        }
        RunEvent::BudgetExhausted { .. } => {
            Some("📝 Writing the answer...".to_owned())
        }
        _ => None,
    }
}

fn print_answer(answer: &FinalAnswer) {
    let bar = BAR_CHAR.bright_cyan();
    println!();
    for (idx, line) in answer.text().lines().enumerate() {
        if idx == 0 {
            println!("{bar}🤖 {}", line.bright_white());
        } else {
            println!("{bar}{}", line.bright_white());
        }
    }

    let sources = answer.evidence().source_urls();
    if !sources.is_empty() {
        println!();
        println!("{}", "Sources:".bold());
        for url in sources {
            println!("  - {}", url.dimmed());
        }
    }

    if answer.is_exhausted() {
        let bar = BAR_CHAR.bright_yellow();
        println!();
        println!(
            "{bar}⚠️  The search budget of {} turns ran out. This answer is \
             based on the evidence gathered so far.",
            answer.turns()
        );
    }
    println!();
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
