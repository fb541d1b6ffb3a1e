use anyhow::{Context, Result, bail};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::completion::ChatClient;
use crate::config::Config;
use crate::database::DocumentStore;
use crate::embeddings::OllamaClient;
use crate::ingest::ocr::model_paths;
use crate::ingest::{CompletionDescriber, Ingestor, OcrsRecognizer};
use crate::retrieval::QueryEngine;

/// Open the document store with the configured embedder
async fn open_store(config: &Config) -> Result<Arc<DocumentStore>> {
    let embedder = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let store = DocumentStore::new(config, Arc::new(embedder))
        .await
        .context("Failed to open document store")?;
    Ok(Arc::new(store))
}

fn completion_client(config: &Config) -> Result<Arc<ChatClient>> {
    let client = ChatClient::new(&config.completion).context("Failed to create completion client")?;
    Ok(Arc::new(client))
}

/// Completion-backed describer, with OCR when the models are installed
fn describer(config: &Config) -> Result<CompletionDescriber> {
    let describer = CompletionDescriber::new(completion_client(config)?);

    match OcrsRecognizer::load(&config.ocr_models_path()) {
        Ok(recognizer) => Ok(describer.with_ocr(Arc::new(recognizer))),
        Err(e) => {
            warn!("Image OCR disabled: {:#}", e);
            Ok(describer)
        }
    }
}

/// `requested` wins over the configured default; zero is rejected
#[inline]
pub fn resolve_top_k(requested: Option<usize>, config: &Config) -> Result<NonZeroUsize> {
    let top_k = requested.unwrap_or(config.retrieval.top_k);
    NonZeroUsize::new(top_k).context("top-k must be at least 1")
}

/// Describe and index files (or the files of directories) into a collection
#[inline]
pub async fn add_documents(data_dir: &Path, collection: &str, paths: &[PathBuf]) -> Result<()> {
    let config = Config::load(data_dir)?;
    let store = open_store(&config).await?;
    let ingestor = Ingestor::new(store.clone(), Arc::new(describer(&config)?));

    info!("Adding {} paths to '{}'", paths.len(), collection);
    let report = ingestor.add_documents(collection, paths).await?;

    for record in &report.added {
        println!("✅ [{}] {}", record.id, record.metadata.path);
    }
    for (path, reason) in &report.failed {
        println!("❌ {}: {}", path.display(), reason);
    }
    println!(
        "Added {} documents to '{}' ({} total)",
        report.added.len(),
        collection,
        store.count(collection).await?
    );

    if report.added.is_empty() && !report.failed.is_empty() {
        bail!("No documents could be added to '{}'", collection);
    }
    Ok(())
}

/// Answer a question from a collection and print the reply
#[inline]
pub async fn query_collection(
    data_dir: &Path,
    collection: &str,
    text: &str,
    top_k: Option<usize>,
    verbose: bool,
) -> Result<()> {
    let config = Config::load(data_dir)?;
    let top_k = resolve_top_k(top_k, &config)?;
    let engine = QueryEngine::new(open_store(&config).await?, completion_client(&config)?);

    let answer = engine.query(collection, text, top_k, verbose).await?;
    println!("{}", answer);
    Ok(())
}

#[inline]
pub async fn delete_collection(data_dir: &Path, collection: &str) -> Result<()> {
    let config = Config::load(data_dir)?;
    let store = open_store(&config).await?;

    store.delete_collection(collection).await?;
    println!("Deleted collection '{}'", collection);
    Ok(())
}

#[inline]
pub async fn list_collections(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir)?;
    let store = open_store(&config).await?;

    let collections = store.list_collections().await?;
    if collections.is_empty() {
        println!("No collections found. Use 'docusense add <collection> <paths>...' to create one.");
        return Ok(());
    }

    println!("📚 Collections");
    println!("{}", "=".repeat(50));
    for name in collections {
        println!("   {:<32} {:>8} documents", name, store.count(&name).await?);
    }
    Ok(())
}

/// Report configuration and reachability of every component
#[inline]
pub async fn show_status(data_dir: &Path) -> Result<()> {
    let config = Config::load(data_dir).unwrap_or_else(|e| {
        warn!("Falling back to default configuration: {:#}", e);
        Config {
            base_dir: data_dir.to_path_buf(),
            ..Config::default()
        }
    });

    println!("📊 DocuSense Status Report");
    println!("{}", "=".repeat(50));
    println!();
    println!("📁 Data directory: {}", data_dir.display());
    println!();

    println!("🤖 Embedding Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", config.ollama.model);
                println!("   🔢 Dimension: {}", config.ollama.embedding_dimension);
            }
            Err(e) => println!("   ⚠️  Ollama: Unreachable - {}", e),
        },
        Err(e) => println!("   ❌ Ollama: Invalid configuration - {:#}", e),
    }

    println!("💬 Completion Status:");
    println!("   📋 Endpoint: {}", config.completion.base_url);
    println!("   📋 Model: {}", config.completion.model);
    if std::env::var(&config.completion.api_key_env).is_ok() {
        println!("   ✅ API key: {} is set", config.completion.api_key_env);
    } else {
        println!("   ⚠️  API key: {} is not set", config.completion.api_key_env);
    }

    println!("🔤 OCR Status:");
    let missing: Vec<_> = model_paths(&config.ocr_models_path())
        .into_iter()
        .filter(|path| !path.is_file())
        .collect();
    if missing.is_empty() {
        println!("   ✅ Models: {}", config.ocr_models_path().display());
    } else {
        for path in missing {
            println!("   ⚠️  Missing model: {} (image text is skipped)", path.display());
        }
    }

    println!("🔍 Vector Database Status:");
    match open_store(&config).await {
        Ok(store) => {
            println!("   ✅ LanceDB: {}", store.path().display());
            match store.list_collections().await {
                Ok(collections) => {
                    println!("   📚 Collections: {}", collections.len());
                    for name in collections {
                        let count = store.count(&name).await.unwrap_or_default();
                        println!("      {} ({} documents)", name, count);
                    }
                }
                Err(e) => println!("   ⚠️  Failed to list collections - {}", e),
            }
        }
        Err(e) => println!("   ❌ LanceDB: Failed to open - {:#}", e),
    }

    Ok(())
}
