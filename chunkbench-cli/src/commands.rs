//! Subcommand handlers.

use std::path::Path;
use std::sync::Arc;

use chunkbench_core::chunk::Chunker;
use chunkbench_core::config::{BenchConfig, load_config, workspace_config_path};
use chunkbench_core::embeddings::create_embedder;
use chunkbench_core::experiment::{Collaborators, ExperimentRunner};
use chunkbench_core::extract::{PlainTextExtractor, TextExtractor};
use chunkbench_core::generation::{GenerationService, OpenAiCompatibleGenerator};
use chunkbench_core::metrics::SemanticScorer;
use chunkbench_core::store::DirectoryDocumentStore;
use chunkbench_core::tokenizer::load_tokenizer;

use crate::report;
use crate::{Commands, ConfigAction};

pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            corpus,
            output,
            num_queries,
            top_k,
            only,
            no_generation,
            semantic,
        } => {
            let mut config = load(workspace)?;
            if let Some(n) = num_queries {
                config.experiment.num_queries = n;
            }
            if let Some(k) = top_k {
                config.experiment.top_k = k;
            }
            if no_generation {
                config.generation.enabled = false;
            }
            if semantic {
                config.metrics.semantic = true;
            }
            if !only.is_empty() {
                config.strategies.retain(|s| only.contains(&s.name));
                if config.strategies.is_empty() {
                    anyhow::bail!("No configured strategy matches {:?}", only);
                }
            }
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
            handle_run(&config, &corpus, &output).await
        }
        Commands::Chunk {
            file,
            strategy,
            size,
            overlap,
            plain,
        } => handle_chunk(workspace, &file, &strategy, size, overlap, plain),
        Commands::Config { action } => handle_config(action, workspace),
    }
}

fn load(workspace: &Path) -> anyhow::Result<BenchConfig> {
    load_config(Some(workspace), None).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
}

async fn handle_run(config: &BenchConfig, corpus: &Path, output: &Path) -> anyhow::Result<()> {
    let store = DirectoryDocumentStore::open(corpus)?;
    let embedder = create_embedder(&config.embedding)?;
    let generator: Option<Arc<dyn GenerationService>> = if config.generation.enabled {
        Some(Arc::new(OpenAiCompatibleGenerator::new(&config.generation)))
    } else {
        None
    };
    let semantic = config
        .metrics
        .semantic
        .then(|| Arc::new(SemanticScorer::new(embedder.clone())));

    let collaborators = Collaborators::new(Arc::new(store), embedder)
        .with_generator(generator)
        .with_tokenizer(load_tokenizer(&config.tokenizer))
        .with_semantic(semantic);

    let runner = ExperimentRunner::from_config(collaborators, config);
    let results = runner.run_all().await?;

    let (json_path, md_path) = report::write_reports(&results, output)?;
    println!("Evaluated {} strategies", results.len());
    if let Some(best) = report::best_overall(&results) {
        println!("Best overall: {best}");
    }
    println!("JSON report: {}", json_path.display());
    println!("Markdown report: {}", md_path.display());
    Ok(())
}

fn handle_chunk(
    workspace: &Path,
    file: &Path,
    strategy: &str,
    size: usize,
    overlap: usize,
    plain: bool,
) -> anyhow::Result<()> {
    let config = load(workspace)?;
    let raw = std::fs::read(file)?;
    let text = PlainTextExtractor.extract(&raw);
    let chunker = Chunker::from_name(strategy, size, overlap)?
        .with_tokenizer(load_tokenizer(&config.tokenizer));
    let chunks = chunker.chunk(&text);

    if !plain {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }
    for (i, chunk) in chunks.iter().enumerate() {
        println!("--- chunk {} ({} chars) ---", i + 1, chunk.chars().count());
        println!("{chunk}");
    }
    println!("{} chunks", chunks.len());
    Ok(())
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_path = workspace_config_path(workspace);
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }
            if let Some(dir) = config_path.parent() {
                std::fs::create_dir_all(dir)?;
            }

            let toml_str = toml::to_string_pretty(&BenchConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = load(workspace)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkbench_core::types::Document;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_config_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let command = Commands::Config {
            action: ConfigAction::Init,
        };
        handle_command(command, dir.path()).await.unwrap();

        let config_path = dir.path().join(".chunkbench").join("config.toml");
        assert!(config_path.exists());

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: BenchConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, BenchConfig::default());
    }

    #[tokio::test]
    async fn test_config_init_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = workspace_config_path(dir.path());
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, "[experiment]\ntop_k = 3\n").unwrap();

        handle_command(
            Commands::Config {
                action: ConfigAction::Init,
            },
            dir.path(),
        )
        .await
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&config_path).unwrap(),
            "[experiment]\ntop_k = 3\n"
        );
    }

    #[tokio::test]
    async fn test_run_writes_reports() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus");
        let body = "Chunk boundaries decide which facts share a passage and how well retrieval works.\n\n\
                    Overlap keeps a sentence that straddles a boundary visible to both neighbours.";
        DirectoryDocumentStore::create(
            &corpus,
            &[(
                Document::new("2501.00001", "Chunking", "Chunk boundaries decide which facts share a passage."),
                body.as_bytes().to_vec(),
            )],
        )
        .unwrap();

        let output = dir.path().join("out");
        let command = Commands::Run {
            corpus,
            output: output.clone(),
            num_queries: Some(5),
            top_k: None,
            only: vec!["Fixed-500".into(), "Sentence-500".into()],
            no_generation: true,
            semantic: false,
        };
        handle_command(command, dir.path()).await.unwrap();

        assert!(output.join(report::JSON_REPORT).exists());
        let md = std::fs::read_to_string(output.join(report::MARKDOWN_REPORT)).unwrap();
        assert!(md.contains("Fixed-500"));
        assert!(md.contains("Sentence-500"));
        assert!(!md.contains("Token-256"));
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_strategy_filter() {
        let dir = tempfile::tempdir().unwrap();
        let command = Commands::Run {
            corpus: dir.path().to_path_buf(),
            output: dir.path().join("out"),
            num_queries: None,
            top_k: None,
            only: vec!["Nope".into()],
            no_generation: true,
            semantic: false,
        };
        assert!(handle_command(command, dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_chunk_rejects_unknown_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("doc.txt");
        std::fs::write(&file, "First paragraph.\n\nSecond paragraph.").unwrap();

        let ok = Commands::Chunk {
            file: file.clone(),
            strategy: "paragraph".into(),
            size: 100,
            overlap: 0,
            plain: false,
        };
        assert!(handle_command(ok, dir.path()).await.is_ok());

        let bad = Commands::Chunk {
            file,
            strategy: "semantic".into(),
            size: 100,
            overlap: 0,
            plain: true,
        };
        let err = handle_command(bad, dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("Unknown chunking strategy"));
    }
}
