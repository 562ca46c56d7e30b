use anyhow::Result;
use clap::Parser;
use graphrag::llm::OpenAiChat;
use graphrag::rerank::PongoReranker;
use graphrag::retrieval::AstraDb;
use graphrag::{Config, TraversalEngine, TraversalParams};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "graphrag")]
#[command(about = "Answer a question via recursive LLM-guided retrieval")]
struct Args {
    /// The question to answer
    question: String,

    /// Decomposition rounds before sufficiency is forced (overrides config)
    #[arg(long)]
    depth: Option<usize>,

    /// Passages kept per sub-query after reranking (overrides config)
    #[arg(long)]
    top_k: Option<usize>,

    /// Sub-queries requested per decomposition round (overrides config)
    #[arg(long)]
    queries_per_step: Option<usize>,

    /// Generate a final answer from the gathered evidence
    #[arg(short, long)]
    answer: bool,
}

/// Wire the three service clients from config + environment
fn build_engine(config: &Config) -> Result<TraversalEngine> {
    let api_endpoint = config.env_credential(&config.vector_db.api_endpoint_env)?;
    let token = config.env_credential(&config.vector_db.token_env)?;
    let pongo_key = config.env_credential(&config.reranker.api_key_env)?;
    let openai_key = config.env_credential(&config.llm.api_key_env)?;

    let retrieval = Arc::new(AstraDb::new(
        api_endpoint,
        token,
        config.vector_db.keyspace.clone(),
    ));
    let ranking = Arc::new(PongoReranker::new(pongo_key));
    let completion = Arc::new(OpenAiChat::new(
        openai_key,
        config.llm.model.clone(),
        config.llm.temperature,
        config.llm.max_retries,
    ));

    Ok(
        TraversalEngine::new(retrieval, ranking, completion, config.vector_db.collection.clone())
            .with_candidate_pool(config.traversal.candidate_pool_size),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration (also loads .env for credentials)
    let config = Config::load()?;

    // Initialize logger from environment variable or the configured level
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", &config.graphrag.log_level),
    )
    .init();

    log::info!("Starting GraphRAG v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Collection: {}", config.vector_db.collection);
    log::info!("Completion model: {}", config.llm.model);

    let params = TraversalParams {
        max_recursion_depth: args.depth.unwrap_or(config.traversal.max_recursion_depth),
        top_k_per_query: args.top_k.unwrap_or(config.traversal.top_k_per_query),
        queries_per_step: args
            .queries_per_step
            .unwrap_or(config.traversal.queries_per_step),
        generate_answer: args.answer || config.traversal.generate_answer,
    };

    let engine = build_engine(&config)?;

    let start = Instant::now();
    let result = engine.traverse(&args.question, &params).await?;
    let duration = start.elapsed();

    println!("\nQuestion: \"{}\"\n", args.question);

    if result.evidence.is_empty() {
        println!("No supporting evidence found.");
    } else {
        println!("Evidence ({} passage(s)):", result.evidence.len());
        for (idx, text) in result.evidence.texts().iter().enumerate() {
            println!("  [{}] {}", idx + 1, text);
        }
    }

    if let Some(answer) = &result.answer {
        println!("\nAnswer:");
        if answer.is_empty() {
            println!("  (answer generation failed; see logs)");
        } else {
            println!("  {}", answer);
        }
    }

    println!(
        "\nTraversal took {:?} (depth={}, top_k={}, queries_per_step={})",
        duration, params.max_recursion_depth, params.top_k_per_query, params.queries_per_step
    );

    Ok(())
}
