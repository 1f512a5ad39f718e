use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use edumind_core::{
    ingest_folder_chunks, new_session_id, AnswerOrigin, CannedAnswerTable, CharacterNgramEmbedder,
    ChatPipeline, ChatReply, ChatRequest, Embedder, EmbeddingSettings, HttpEmbedder,
    IngestionOptions, LlmSettings, OpenAiChatModel, PipelineError, PipelineSettings,
    DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_EMBEDDING_URL, DEFAULT_SESSION_ID, DEFAULT_TOP_K,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Pipeline = ChatPipeline<Box<dyn Embedder>, OpenAiChatModel>;

#[derive(Parser)]
#[command(name = "edumind", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder scanned recursively for documents at startup.
    #[arg(long, global = true, default_value = "data")]
    data_dir: PathBuf,

    /// Document extension to ingest; repeat for more.
    #[arg(long = "extension", global = true, default_values_t = ["docx".to_string()])]
    extensions: Vec<String>,

    /// Maximum chunk length in characters.
    #[arg(long, global = true, default_value = "1000")]
    chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(long, global = true, default_value = "100")]
    chunk_overlap: usize,

    /// Number of chunks passed to the answer prompt.
    #[arg(long, global = true, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Chat-completions api key.
    #[arg(long, global = true, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible chat api base URL
    #[arg(long, global = true, default_value = DEFAULT_API_BASE)]
    api_base: String,

    #[arg(long, global = true, default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    /// Sampling temperature; the provider default when unset.
    #[arg(long, global = true)]
    temperature: Option<f32>,

    #[arg(long, global = true, value_enum, default_value_t = EmbeddingBackend::Http)]
    embedding_backend: EmbeddingBackend,

    /// OpenAI-compatible embeddings base URL
    #[arg(long, global = true, env = "EDUMIND_EMBEDDING_URL", default_value = DEFAULT_EMBEDDING_URL)]
    embedding_url: String,

    #[arg(long, global = true, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    #[arg(long, global = true, env = "EDUMIND_EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Scale every embedding to unit length.
    #[arg(long, global = true, default_value_t = false)]
    normalize_embeddings: bool,

    /// Timeout for each remote call, in seconds.
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// JSON file replacing the built-in canned answers.
    #[arg(long, global = true)]
    canned_answers: Option<PathBuf>,

    /// Conversation the history is kept under.
    #[arg(long, global = true, default_value = DEFAULT_SESSION_ID)]
    session: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum EmbeddingBackend {
    /// Remote sentence-transformers model behind an /embeddings endpoint.
    Http,
    /// Offline character n-gram hashing.
    Ngram,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a single question and exit.
    Ask {
        #[arg(long)]
        question: String,
        /// Canned answer category to match against.
        #[arg(long)]
        category: Option<String>,
    },
    /// Interactive conversation on the terminal.
    Chat {
        #[arg(long)]
        category: Option<String>,
        /// Print every turn after each answer.
        #[arg(long, default_value_t = false)]
        show_history: bool,
        /// Start under a fresh random session id.
        #[arg(long, default_value_t = false)]
        new_session: bool,
    },
    /// List canned answer categories and their questions.
    Categories,
    /// Load and chunk the document folder without contacting any service.
    Ingest,
}

impl Cli {
    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            data_dir: self.data_dir.clone(),
            ingestion: IngestionOptions {
                chunk_max_chars: self.chunk_size,
                chunk_overlap_chars: self.chunk_overlap,
                extensions: self.extensions.clone(),
            },
            top_k: self.top_k,
            default_session: DEFAULT_SESSION_ID.to_string(),
        }
    }

    fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            model: self.chat_model.clone(),
            temperature: self.temperature,
            timeout: self.timeout(),
        }
    }

    fn embedder(&self) -> Result<Box<dyn Embedder>, PipelineError> {
        match self.embedding_backend {
            EmbeddingBackend::Http => {
                let settings = EmbeddingSettings {
                    base_url: self.embedding_url.clone(),
                    model: self.embedding_model.clone(),
                    api_key: self.embedding_api_key.clone(),
                    normalize: self.normalize_embeddings,
                    timeout: self.timeout(),
                    ..EmbeddingSettings::default()
                };
                Ok(Box::new(HttpEmbedder::new(&settings)?))
            }
            EmbeddingBackend::Ngram => Ok(Box::new(CharacterNgramEmbedder {
                dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
                normalize: self.normalize_embeddings,
            })),
        }
    }

    fn canned(&self) -> Result<CannedAnswerTable, PipelineError> {
        match &self.canned_answers {
            Some(path) => CannedAnswerTable::load(path),
            None => Ok(CannedAnswerTable::builtin()),
        }
    }

    async fn start(&self) -> anyhow::Result<Pipeline> {
        let pipeline =
            ChatPipeline::start(&self.pipeline_settings(), &self.llm_settings(), self.embedder()?, self.canned()?)
                .await?;
        Ok(pipeline)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "edumind boot"
    );

    match &cli.command {
        Command::Categories => {
            let canned = cli.canned()?;
            for category in canned.categories() {
                println!("{}", category.category);
                for entry in &category.entries {
                    println!("  - {}", entry.question);
                }
            }
        }
        Command::Ingest => {
            let settings = cli.pipeline_settings();
            settings.validate()?;
            let corpus = ingest_folder_chunks(&settings.data_dir, &settings.ingestion)?;

            for skipped in &corpus.skipped_files {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            println!(
                "{} documents, {} chunks, {} skipped at {}",
                corpus.document_count,
                corpus.chunks.len(),
                corpus.skipped_files.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask { question, category } => {
            let pipeline = cli.start().await?;
            let mut request = ChatRequest::new(cli.session.clone(), question.clone());
            request.category = category.clone();

            let reply = pipeline.handle(&request).await;
            print_reply(&reply);
            if reply.origin == AnswerOrigin::Failed {
                anyhow::bail!("question could not be answered");
            }
        }
        Command::Chat {
            category,
            show_history,
            new_session,
        } => {
            let pipeline = cli.start().await?;
            let session = if *new_session {
                new_session_id()
            } else {
                cli.session.clone()
            };
            run_chat(&pipeline, session, category.clone(), *show_history).await?;
        }
    }

    Ok(())
}

fn print_reply(reply: &ChatReply) {
    println!("{}", reply.answer);
    if !reply.sources.is_empty() {
        println!("sources: {}", reply.sources.join(", "));
    }
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

async fn run_chat(
    pipeline: &Pipeline,
    session: String,
    mut category: Option<String>,
    show_history: bool,
) -> anyhow::Result<()> {
    println!(
        "EduMind ready ({} chunks indexed, session {session}). Type /quit to leave.",
        pipeline.corpus().chunks
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();

        match input.split_once(' ').map_or((input, ""), |(head, rest)| (head, rest.trim())) {
            ("", _) => {}
            ("/quit" | "/exit", _) => break,
            ("/clear", _) => {
                pipeline.clear_history(&session);
                println!("history cleared");
            }
            ("/history", _) => print_history(pipeline, &session),
            ("/categories", _) => {
                for entry in pipeline.canned().categories() {
                    println!("{}", entry.category);
                }
            }
            ("/category", "") => {
                category = None;
                println!("category cleared");
            }
            ("/category", name) => match pipeline.canned().category(name) {
                Some(found) => {
                    println!("category set to {}", found.category);
                    category = Some(found.category.clone());
                }
                None => println!("unknown category: {name}"),
            },
            _ => {
                let mut request = ChatRequest::new(session.clone(), input);
                request.category = category.clone();
                let reply = pipeline.handle(&request).await;
                print_reply(&reply);
                if show_history {
                    print_history(pipeline, &session);
                }
            }
        }
        prompt()?;
    }

    info!(session = %session, turns = pipeline.history(&session).len(), "chat closed");
    Ok(())
}

fn print_history(pipeline: &Pipeline, session: &str) {
    let history = pipeline.history(session);
    if history.is_empty() {
        println!("(no history)");
    }
    for turn in history {
        println!("You: {}", turn.user);
        println!("EduMind: {}", turn.assistant);
    }
}
