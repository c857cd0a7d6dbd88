//! Batch-insert a handful of articles, then query with and without a
//! metadata filter.
//!
//! Run with: cargo run --example interests
//! Set SEMANTIC_STORE_EMBEDDER to a served model name to use a real embedder.

use semantic_store::facade::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> semantic_store::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = StoreConfig::new()
        .with_collection("interests")
        .with_embedder_name("hashing")
        .with_env_overrides();
    let store = SemanticStore::open(config).await?;
    let interests = store.require_active()?;

    let articles = [
        (
            "An article about football and soccer",
            json!({"name": "Sports Article", "category": "sports", "page_number": 12}),
        ),
        (
            "An article about baseball",
            json!({"name": "Sports Article 2", "category": "sports", "page_number": 13}),
        ),
        (
            "A detailed explanation of quantum mechanics",
            json!({"name": "Science News", "category": "science", "page_number": 45}),
        ),
        (
            "A guide to making the perfect lasagna",
            json!({"name": "Cooking Tips", "category": "cooking", "page_number": 30}),
        ),
        (
            "Exploring the beaches in Hawaii",
            json!({"name": "Travel Guide", "category": "travel", "page_number": 70}),
        ),
        (
            "Advice on cardio workouts and staying fit",
            json!({"name": "Fitness Tips", "category": "fitness", "page_number": 15}),
        ),
    ];
    let texts: Vec<String> = articles.iter().map(|(t, _)| t.to_string()).collect();
    let metadatas = articles
        .iter()
        .map(|(_, m)| metadata_from_json(m).map(Some))
        .collect::<Result<Vec<_>>>()?;
    interests.batch_insert(&texts, Some(metadatas), None).await?;

    let hits = interests
        .query("physical activity, sports, and fitness", 2, None)
        .await?;
    println!("\nwithout filter...\n");
    println!("{}", serde_json::to_string_pretty(&hits)?);

    let filter = json!({"category": {"$in": ["fitness", "travel"]}});
    let hits = interests
        .query("physical activity, sports, and fitness", 1, Some(&filter))
        .await?;
    println!("\nwith filter...\n");
    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(())
}
