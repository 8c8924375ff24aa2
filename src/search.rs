//! `crag search`: one-shot similarity search.

use anyhow::Result;

use crate::config::Config;
use crate::engine::open_engine;
use crate::session::preview;

pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let engine = open_engine(config)?;
    let k = limit.unwrap_or(config.retrieval.search_k);
    let results = engine.search(query, k).await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let (text, _) = preview(&result.text, config.retrieval.preview_chars);
        println!(
            "{}. [{:.2}] chunk {} (distance {:.4})",
            i + 1,
            result.similarity,
            result.chunk_id,
            result.distance
        );
        println!("    excerpt: \"{}\"", text.replace('\n', " ").trim());
        println!();
    }
    Ok(())
}
