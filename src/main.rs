use anyhow::Context;
use askmydocs::{
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        Cli, Commands,
    },
    storage::{extract_text, DocumentStore, LocalDocumentStore},
    AskConfig, DocumentMetadata, ModelChoice, RagPipeline,
};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Commands::Init {
        path,
        force,
        backend,
    } = &cli.command
    {
        let result = init::run(
            InitConfig {
                path: path.clone(),
                force: *force,
                backend: backend.clone(),
            },
            &output,
        );
        return match result {
            InitResult::Success | InitResult::AlreadyExists => Ok(()),
            InitResult::Error(e) => Err(anyhow::anyhow!(e)),
        };
    }

    let config = AskConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_tracing(&config, cli.verbose);

    let pipeline = RagPipeline::open(&config)
        .await
        .context("opening the RAG pipeline")?;

    match cli.command {
        Commands::Ingest {
            path,
            doc_id,
            filename,
        } => {
            let store = LocalDocumentStore::new(&config.storage.documents_dir);
            ingest(&pipeline, &store, &path, doc_id, filename, &output).await
        }
        Commands::Ask {
            question,
            model,
            json,
        } => {
            let model = model.unwrap_or(pipeline.default_model());
            ask(&pipeline, &question, model, json, &output).await
        }
        Commands::Stats => stats(&pipeline, &output).await,
        Commands::Init { .. } => Ok(()),
    }
}

fn init_tracing(config: &AskConfig, verbose: bool) {
    let fallback = if verbose {
        "askmydocs=debug,askmydocs_vector=debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // Diagnostics go to stderr so answers on stdout stay pipeable.
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn ingest(
    pipeline: &RagPipeline,
    store: &dyn DocumentStore,
    path: &Path,
    doc_id: Option<String>,
    filename: Option<String>,
    output: &Output,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let filename = filename
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .context("cannot derive a filename, pass --filename")?;
    let doc_id = doc_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let text = extract_text(&filename, &bytes)?;
    let stored = store.save(&filename, &bytes).await?;
    output.created("document", &stored.location);

    let report = pipeline
        .ingest(&doc_id, &text, DocumentMetadata::new(&doc_id, &filename))
        .await?;

    if report.chunks == 0 {
        output.warning(&format!(
            "No indexable text in {} (only .txt, .md and .pdf are extracted)",
            filename
        ));
    } else {
        output.success(&format!(
            "Indexed {} as doc {} ({} chunks)",
            filename, report.doc_id, report.chunks
        ));
    }
    if report.stored_for_doc > report.chunks {
        output.hint(&format!(
            "{} older chunks of doc {} are still indexed",
            report.stored_for_doc - report.chunks,
            report.doc_id
        ));
    }
    Ok(())
}

async fn ask(
    pipeline: &RagPipeline,
    question: &str,
    model: ModelChoice,
    json: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let result = pipeline.answer(question, model).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output.answer(&result.answer, &result.model_used, result.is_degraded());
    if !result.sources.is_empty() {
        output.header("Sources");
        for (i, source) in result.sources.iter().enumerate() {
            output.source(i + 1, source);
        }
    }
    output.newline();
    Ok(())
}

async fn stats(pipeline: &RagPipeline, output: &Output) -> anyhow::Result<()> {
    let stats = pipeline.stats().await?;

    output.header("Vector index");
    output.kv("collection", &stats.collection);
    output.kv("embedding provider", &stats.provider);
    output.kv(
        "dimensions",
        &stats
            .dimensions
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
    );
    output.kv("chunks", &stats.record_count.to_string());
    output.kv("metric", stats.metric.name());
    output.kv(
        "path",
        &stats
            .path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(in memory)".to_string()),
    );
    output.newline();
    Ok(())
}
