//! Raw vector search against the configured collection, bypassing the
//! traversal loop. Useful for checking what the store returns for a query.

use anyhow::Result;
use graphrag::retrieval::AstraDb;
use graphrag::{Config, RetrievalPort};
use std::time::Instant;

/// Parse CLI args: optional --k <count>; first positional is the query.
fn parse_search_args() -> Result<(String, Option<usize>)> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut query = None;
    let mut k = None;
    let mut next_k = false;
    for arg in &args {
        if next_k {
            k = Some(arg.parse()?);
            next_k = false;
            continue;
        }
        if arg == "--k" {
            next_k = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        if query.is_none() {
            query = Some(arg.clone());
        }
    }
    let query = query.ok_or_else(|| {
        anyhow::anyhow!("Usage: search <query> [--k <count>]\nExample: search \"Who was in the US?\" --k 5")
    })?;
    if query.trim().is_empty() {
        anyhow::bail!("Query cannot be empty");
    }
    Ok((query, k))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let config = Config::load()?;

    let api_endpoint = config.env_credential(&config.vector_db.api_endpoint_env)?;
    let token = config.env_credential(&config.vector_db.token_env)?;

    let db = AstraDb::new(api_endpoint, token, config.vector_db.keyspace.clone());

    let (query, k) = parse_search_args()?;
    let k = k.unwrap_or(5);

    let start = Instant::now();
    let hits = db.search(&config.vector_db.collection, &query, k).await?;
    let duration = start.elapsed();

    println!("\nQuery: \"{}\"\n", query);

    if hits.is_empty() {
        println!("No results found.");
    } else {
        for (idx, hit) in hits.iter().enumerate() {
            match hit.score {
                Some(score) => println!("#{} (score: {:.3}) {}", idx + 1, score, hit.text),
                None => println!("#{} {}", idx + 1, hit.text),
            }
        }
    }

    println!("\nResults: {}", hits.len());
    println!("Latency: {:?}", duration);

    Ok(())
}
