//! Command-line interface for the DocVault RAG pipeline.
//!
//! Indexes local files and free text into a file-backed vector store and
//! answers queries against it through a local Ollama server. Logs go to
//! stderr so command output stays pipeable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docvault_rag::ollama::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBED_MODEL, DEFAULT_ENDPOINT, ENDPOINT_ENV, OllamaEmbedder,
    OllamaGenerator,
};
use docvault_rag::{DEFAULT_DB_PATH, Document, FileVectorStore, RagConfig, RagPipeline};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docvault")]
#[command(version)]
#[command(about = "Index local documents and ask questions about them with local models.")]
struct Cli {
    /// Directory where collections are stored as JSON files
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Collection to operate on
    #[arg(long, default_value = "default")]
    collection: String,

    /// Ollama server endpoint (falls back to $OLLAMA_HOST)
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Embedding model name
    #[arg(long, value_name = "MODEL", default_value = DEFAULT_EMBED_MODEL)]
    embed_model: String,

    /// Generation model name
    #[arg(long, value_name = "MODEL", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a text file
    AddFile {
        /// Path of the file to index
        path: PathBuf,
    },
    /// Index text passed directly on the command line
    AddText {
        /// The text to index
        text: String,
    },
    /// List every indexed chunk in the collection
    List,
    /// Delete every document in the collection
    DeleteAll,
    /// Find documents relevant to a query
    Search {
        /// The search query
        query: String,
    },
    /// Ask a question answered from the indexed documents
    Ask {
        /// The question to answer
        question: String,
    },
    /// Summarize text with the generation model (no retrieval involved)
    Summarize {
        /// The text to summarize
        text: Option<String>,

        /// Read the text to summarize from a file instead
        #[arg(long, value_name = "PATH", conflicts_with = "text")]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let pipeline = build_pipeline(&cli)?;

    match cli.command {
        Command::AddFile { path } => {
            let content = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let title =
                path.file_name().and_then(|name| name.to_str()).unwrap_or("Untitled").to_string();
            let document =
                Document::new(title, content).with_metadata("source", path.display().to_string());
            let chunks = pipeline.ingest(&[document]).await?;
            println!("Added 1 document ({chunks} chunk(s)).");
        }
        Command::AddText { text } => {
            let document =
                Document::new("Direct Input", text).with_metadata("type", "direct_input");
            let chunks = pipeline.ingest(&[document]).await?;
            println!("Added 1 document ({chunks} chunk(s)).");
        }
        Command::List => {
            let documents = pipeline.list_all().await?;
            if documents.is_empty() {
                println!("No documents found in the collection.");
            } else {
                for (i, document) in documents.iter().enumerate() {
                    println!("{}. {} (id: {})", i + 1, document.title, document.id);
                }
            }
        }
        Command::DeleteAll => {
            pipeline.delete_all().await?;
            println!(
                "All documents deleted from collection '{}'.",
                pipeline.config().collection
            );
        }
        Command::Search { query } => {
            let titles = pipeline.search(&query).await?;
            if titles.is_empty() {
                println!("No results found.");
            } else {
                println!("Search results:");
                for (i, title) in titles.iter().enumerate() {
                    println!("{}. {title}", i + 1);
                }
            }
        }
        Command::Ask { question } => {
            let answer = pipeline.generate(&question).await?;
            println!("{answer}");
        }
        Command::Summarize { text, file } => {
            let text = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => bail!("provide text to summarize, or --file <PATH>"),
            };
            let summary = pipeline.summarize(&text).await?;
            println!("{summary}");
        }
    }

    Ok(())
}

/// Route logs to stderr, defaulting to `info` unless `RUST_LOG` says otherwise.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_pipeline(cli: &Cli) -> Result<RagPipeline> {
    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| std::env::var(ENDPOINT_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let config = RagConfig::builder().collection(cli.collection.clone()).build()?;
    let pipeline = RagPipeline::builder()
        .config(config)
        .embedding_provider(Arc::new(OllamaEmbedder::new(&endpoint, &cli.embed_model)))
        .vector_store(Arc::new(FileVectorStore::new(&cli.db_path)))
        .generation_provider(Arc::new(OllamaGenerator::new(&endpoint, &cli.chat_model)))
        .build()?;
    Ok(pipeline)
}
