mod assistant;
mod chat;
mod classify;
mod config;
mod corpus;
mod eval;
mod openai;
mod phrases;
mod rag;
mod server;
mod session;
mod spe;
mod translate;

pub const USER_AGENT: &str = concat!("funsani/", env!("CARGO_PKG_VERSION"));

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::{info, warn};

use assistant::Assistant;
use config::Config;
use corpus::EmbeddingRetriever;
use openai::OpenAiClient;
use phrases::PhraseBook;
use rag::RagChain;
use session::ChatSession;
use spe::{KnowledgeBase, SpeChain};
use translate::{Lang, Translator, detect_language};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(90);

#[derive(Parser)]
#[command(name = "funsani", version, about = "Ask questions in Chichewa or English")]
struct Cli {
    /// Answer model (overrides FUNSANI_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Chunks retrieved per query (overrides FUNSANI_RETRIEVAL_K)
    #[arg(long, short = 'k', global = true)]
    k: Option<NonZeroUsize>,

    /// Corpus directory (overrides FUNSANI_DOCS_DIR)
    #[arg(long, global = true)]
    docs_dir: Option<PathBuf>,

    /// Vector index file (overrides FUNSANI_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single query
    Ask {
        query: String,
        /// Use the structured knowledge base instead of document retrieval
        #[arg(long)]
        spe: bool,
        /// Print the full result as JSON
        #[arg(long)]
        metadata: bool,
    },
    /// Interactive chat on stdin
    Chat {
        #[arg(long)]
        spe: bool,
    },
    /// Build the vector index from the corpus
    Ingest {
        /// Rebuild even if an index already exists
        #[arg(long)]
        force: bool,
    },
    /// Serve the JSON chat API
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
        #[arg(long)]
        spe: bool,
    },
    /// Compare retrieval and structured answering on the built-in queries
    Eval {
        /// Run only the first query
        #[arg(long)]
        focused: bool,
        /// Print raw results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Translate text between Chichewa and English
    Translate {
        text: String,
        /// Target language; defaults to the opposite of the detected one
        #[arg(long, value_enum)]
        to: Option<Lang>,
        /// Topic hint, e.g. "sports news article"
        #[arg(long)]
        context: Option<String>,
    },
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.answer.model = model.clone();
        }
        if let Some(k) = self.k {
            config.retrieval_k = k.get();
        }
        if let Some(dir) = &self.docs_dir {
            config.docs_dir = dir.clone();
        }
        if let Some(store) = &self.store {
            config.store_path = store.clone();
        }
    }
}

/// Explicit target, or the opposite of the language the text is written in.
fn translation_target(text: &str, to: Option<Lang>) -> Lang {
    to.unwrap_or_else(|| detect_language(text).other())
}

type Rag = RagChain<OpenAiClient, EmbeddingRetriever<OpenAiClient>>;

async fn rag_chain(config: &Config, client: &OpenAiClient) -> Result<Rag, corpus::CorpusError> {
    let store = corpus::open_or_build(
        client,
        &config.docs_dir,
        &config.store_path,
        &config.embedding_model,
        false,
    )
    .await?;
    if store.embedding_model != config.embedding_model {
        warn!(
            index = %store.embedding_model,
            configured = %config.embedding_model,
            "index was built with a different embedding model; run `funsani ingest --force`"
        );
    }
    Ok(RagChain::new(
        client.clone(),
        config.answer.clone(),
        config.translation.clone(),
        config.classifier.clone(),
        EmbeddingRetriever::new(client.clone(), store),
        config.retrieval_k,
    ))
}

fn spe_chain(
    config: &Config,
    client: &OpenAiClient,
) -> Result<SpeChain<OpenAiClient>, Box<dyn std::error::Error>> {
    let knowledge = KnowledgeBase::load_or_builtin(&config.knowledge_base_path)?;
    let phrases = PhraseBook::load(&config.phrases_path)?;
    Ok(SpeChain::new(
        client.clone(),
        config.answer.clone(),
        config.translation.clone(),
        config.classifier.clone(),
        knowledge,
        phrases,
    ))
}

async fn run_chat<A: Assistant + Sync>(assistant: &A) -> std::io::Result<()> {
    let mut session = ChatSession::new();
    let stdin = BufReader::new(tokio::io::stdin());
    chat::run(assistant, &mut session, stdin, tokio::io::stdout()).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("funsani=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    cli.apply(&mut config);

    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .build()?;
    let client = OpenAiClient::new(
        http,
        config.api_key.as_deref(),
        &config.base_url,
        &config.embedding_model,
    )?;

    match cli.command {
        Command::Ask { query, spe: true, metadata } => {
            let result = spe_chain(&config, &client)?.answer_query(&query).await;
            if metadata {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.answer);
            }
        }
        Command::Ask { query, spe: false, metadata } => {
            let result = rag_chain(&config, &client).await?.answer_query(&query, metadata).await;
            if metadata {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.answer);
                if !result.sources.is_empty() {
                    println!("\nMagwero (Sources): {}", result.sources.join(", "));
                }
            }
        }
        Command::Chat { spe: true } => run_chat(&spe_chain(&config, &client)?).await?,
        Command::Chat { spe: false } => run_chat(&rag_chain(&config, &client).await?).await?,
        Command::Ingest { force } => {
            let store = corpus::open_or_build(
                &client,
                &config.docs_dir,
                &config.store_path,
                &config.embedding_model,
                force,
            )
            .await?;
            info!(chunks = store.len(), path = %config.store_path.display(), "index ready");
        }
        Command::Serve { bind, spe: true } => {
            let state = server::AppState::new(spe_chain(&config, &client)?, spe::APPROACH);
            server::serve(state, &bind).await?;
        }
        Command::Serve { bind, spe: false } => {
            let state = server::AppState::new(rag_chain(&config, &client).await?, rag::APPROACH);
            server::serve(state, &bind).await?;
        }
        Command::Eval { focused, json } => {
            let rag = rag_chain(&config, &client).await?;
            let spe = spe_chain(&config, &client)?;
            let cases = if focused {
                std::slice::from_ref(&eval::FOCUSED_CASE)
            } else {
                eval::EVAL_CASES
            };

            let results = eval::run_comparison(&rag, &spe, cases).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                for (i, result) in results.iter().enumerate() {
                    println!("{}", eval::format_case(i + 1, results.len(), result));
                }
                println!("{}", eval::Summary::from_results(&results));
            }
        }
        Command::Translate { text, to, context } => {
            let target = translation_target(&text, to);
            let translator = Translator::new(client, config.translation.clone());
            let translated = translator
                .with_context(&text, target.other(), target, context.as_deref())
                .await;
            println!("{translated}");
        }
    }

    Ok(())
}
