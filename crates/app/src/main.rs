use anyhow::Context;
use chrono::Utc;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand};
use handbook_rag_core::clients::openai::DEFAULT_OPENAI_BASE_URL;
use handbook_rag_core::{
    ChatRequest, ChatService, ChunkingConfig, DocumentIndex, KeywordScorer,
    OpenAiCompatibleClient, RagOptions, SerpApiSearch, DEFAULT_SESSION_ID,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "handbook-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the handbook PDF
    #[arg(long, env = "HANDBOOK_PDF", default_value = "data/handbook.pdf")]
    document: PathBuf,

    /// Soft chunk budget in characters
    #[arg(long, default_value = "2000", value_parser = at_least_one())]
    chunk_max_chars: usize,

    /// Number of handbook chunks injected per question
    #[arg(long, default_value = "3", value_parser = at_least_one())]
    top_k: usize,

    /// API key for the chat-completions endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    openai_base_url: String,

    /// Model name sent with every completion request
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Sampling temperature
    #[arg(long, default_value = "0.3")]
    temperature: f32,

    /// SerpAPI key; web search is disabled without it
    #[arg(long, env = "SERPAPI_API_KEY", hide_env_values = true)]
    serpapi_key: Option<String>,

    /// Seconds to wait for a completion before giving up
    #[arg(long, default_value = "60")]
    completion_timeout_secs: u64,

    /// Seconds to wait for a web search before continuing without it
    #[arg(long, default_value = "10")]
    search_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Send one message and print the JSON response.
    Ask {
        #[arg(long)]
        message: String,
        #[arg(long, default_value = DEFAULT_SESSION_ID)]
        session: String,
        /// Answer without handbook or web context.
        #[arg(long, default_value_t = false)]
        no_rag: bool,
    },
    /// Interactive conversation on stdin; one message per line.
    Chat {
        #[arg(long, default_value = DEFAULT_SESSION_ID)]
        session: String,
        #[arg(long, default_value_t = false)]
        no_rag: bool,
    },
    /// Print the handbook chunks that best match a query.
    Retrieve {
        #[arg(long)]
        query: String,
    },
    /// Load the handbook and print its fingerprint and chunk statistics.
    Chunks {
        /// Print every chunk's text as well.
        #[arg(long, default_value_t = false)]
        show_text: bool,
    },
}

fn at_least_one() -> RangedU64ValueParser<usize> {
    RangedU64ValueParser::<usize>::new().range(1..)
}

impl Cli {
    fn rag_options(&self) -> RagOptions {
        RagOptions {
            document_path: self.document.clone(),
            chunk_max_chars: self.chunk_max_chars,
            top_k: self.top_k,
            completion_timeout: Duration::from_secs(self.completion_timeout_secs),
            search_timeout: Duration::from_secs(self.search_timeout_secs),
        }
    }

    fn document_index(&self) -> DocumentIndex {
        DocumentIndex::new(
            self.document.clone(),
            ChunkingConfig {
                max_chars: self.chunk_max_chars,
            },
        )
    }

    fn chat_service(&self) -> anyhow::Result<ChatService> {
        let api_key = self
            .openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .context("OPENAI_API_KEY (or --openai-api-key) is required to chat")?;

        let completion = OpenAiCompatibleClient::new(&self.openai_base_url, api_key, &self.model)
            .with_temperature(self.temperature);
        let mut service = ChatService::new(self.rag_options(), Arc::new(completion));

        match self.serpapi_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                service = service.with_web_search(Arc::new(SerpApiSearch::new(key)));
            }
            _ => info!("SERPAPI_API_KEY not set, web search disabled"),
        }

        Ok(service)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        document = %cli.document.display(),
        "handbook-rag boot"
    );

    match &cli.command {
        Command::Ask {
            message,
            session,
            no_rag,
        } => {
            let service = cli.chat_service()?;
            service.warm_up().await;

            let request = ChatRequest {
                message: message.clone(),
                use_rag: !no_rag,
                session_id: session.clone(),
            };
            let output = match service.handle(request).await {
                Ok(response) => serde_json::to_string_pretty(&response)?,
                Err(error) => {
                    warn!(status = error.status_code(), %error, "chat request failed");
                    serde_json::to_string_pretty(&error.to_response())?
                }
            };
            println!("{output}");
        }
        Command::Chat { session, no_rag } => {
            let service = cli.chat_service()?;
            service.warm_up().await;
            run_chat_loop(&service, session, !no_rag).await?;
        }
        Command::Retrieve { query } => {
            let index = cli.document_index();
            index
                .load()
                .await
                .with_context(|| format!("loading {}", cli.document.display()))?;

            let hits = KeywordScorer::new(cli.top_k).retrieve(query, index.chunks());
            if hits.is_empty() {
                println!("no matching chunks for: {query}");
            }
            for hit in hits {
                println!("[chunk {}] score={}", hit.chunk.index, hit.score);
                println!("{}\n", hit.chunk.text);
            }
        }
        Command::Chunks { show_text } => {
            let index = cli.document_index();
            let document = index
                .load()
                .await
                .with_context(|| format!("loading {}", cli.document.display()))?;

            let sizes = document
                .chunks
                .iter()
                .map(|chunk| chunk.text.chars().count())
                .collect::<Vec<_>>();
            println!("source={}", document.fingerprint.source_path);
            println!("checksum={}", document.fingerprint.checksum);
            println!("pages={}", document.fingerprint.page_count);
            println!("characters={}", document.text.chars().count());
            println!(
                "chunks={} largest={} smallest={}",
                sizes.len(),
                sizes.iter().max().copied().unwrap_or_default(),
                sizes.iter().min().copied().unwrap_or_default()
            );

            if *show_text {
                for chunk in &document.chunks {
                    println!("--- chunk {} ({})", chunk.index, chunk.chunk_id);
                    println!("{}", chunk.text);
                }
            }
        }
    }

    Ok(())
}

async fn run_chat_loop(service: &ChatService, session: &str, use_rag: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        let request = ChatRequest {
            message: line.to_string(),
            use_rag,
            session_id: session.to_string(),
        };
        let rendered = match service.handle(request).await {
            Ok(response) => {
                let mut rendered = format!("assistant> {}\n", response.reply);
                for (position, source) in response.sources.iter().enumerate() {
                    let preview = source.chars().take(120).collect::<String>();
                    rendered.push_str(&format!("  [{}] {preview}\n", position + 1));
                }
                rendered
            }
            Err(error) => {
                warn!(status = error.status_code(), %error, "chat request failed");
                format!("assistant> {}\n", error.to_response().reply)
            }
        };
        stdout.write_all(rendered.as_bytes()).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn zero_chunk_budget_is_rejected_at_startup() {
        let result = Cli::try_parse_from(["handbook-rag", "--chunk-max-chars", "0", "chunks"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["handbook-rag", "--top-k", "0", "chunks"]);
        assert!(result.is_err());
    }

    #[test]
    fn defaults_parse_into_rag_options() {
        let cli = Cli::try_parse_from(["handbook-rag", "retrieve", "--query", "vacation"])
            .expect("valid arguments");

        let options = cli.rag_options();
        assert_eq!(options.chunk_max_chars, 2000);
        assert_eq!(options.top_k, 3);
        assert!(matches!(cli.command, Command::Retrieve { .. }));
    }
}
