//! semantic-store: command-line access to a local semantic store
//!
//! Usage:
//!   semantic-store [--config <yaml>] [--collection <name>] <COMMAND> ...

use anyhow::{anyhow, bail, Context};
use semantic_store::facade::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(args).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"semantic-store: embed, store and query text records

USAGE:
    semantic-store [--config <yaml>] [--collection <name>] <COMMAND> [ARGS]

COMMANDS:
    insert <text> [--id <id>] [--meta key=value]...    Insert or replace a record
    update <id> [--text <text>] [--meta key=value]...  Replace text and metadata of a record
    get <id>                                           Print a record as JSON
    delete <id>                                        Delete a record (no error if absent)
    query <text> [--top-k <n>] [--where <json>]        Nearest records, closest first
    collections                                        List collections
    help                                               Show this help message

ENVIRONMENT:
    SEMANTIC_STORE_DIR              Persistence directory
    SEMANTIC_STORE_COLLECTION       Active collection
    SEMANTIC_STORE_EMBEDDER         Embedder name ("hashing" runs offline)
    SEMANTIC_STORE_EMBEDDINGS_URL   Base URL of an OpenAI-compatible embedding server
    SEMANTIC_STORE_API_KEY          Bearer token for the embedding server
    RUST_LOG                        Log filter (default: warn)"#
    );
}

/// Flags shared by every command, plus what is left after removing them.
struct Invocation {
    config: Option<String>,
    collection: Option<String>,
    rest: Vec<String>,
}

fn split_globals(args: Vec<String>) -> anyhow::Result<Invocation> {
    let mut inv = Invocation {
        config: None,
        collection: None,
        rest: Vec::new(),
    };
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => inv.config = Some(iter.next().context("--config needs a path")?),
            "--collection" => {
                inv.collection = Some(iter.next().context("--collection needs a name")?)
            }
            _ => inv.rest.push(arg),
        }
    }
    Ok(inv)
}

/// Value of `--flag <value>` occurrences in `args`.
fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    flag_values(args, flag).into_iter().last()
}

fn parse_meta(pairs: &[&str]) -> anyhow::Result<Option<Metadata>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut metadata = Metadata::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--meta expects key=value, got '{}'", pair))?;
        let value = if let Ok(i) = raw.parse::<i64>() {
            MetadataValue::Integer(i)
        } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
            MetadataValue::Float(f)
        } else if let Ok(b) = raw.parse::<bool>() {
            MetadataValue::Bool(b)
        } else {
            MetadataValue::String(raw.to_string())
        };
        metadata.insert(key.to_string(), value);
    }
    Ok(Some(metadata))
}

/// First argument that is neither a `--flag` nor the value following one.
fn positional(args: &[String], what: &str) -> anyhow::Result<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
            continue;
        }
        return Ok(arg.clone());
    }
    Err(anyhow!("missing {}", what))
}

async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let inv = split_globals(args)?;
    let Some((command, rest)) = inv.rest.split_first() else {
        print_usage();
        bail!("no command given");
    };
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = match inv.config {
        Some(ref path) => StoreConfig::from_yaml_file(path)?,
        None => StoreConfig::default(),
    }
    .with_env_overrides();
    if let Some(name) = inv.collection {
        config = config.with_collection(name);
    }
    let store = SemanticStore::open(config).await?;

    match command.as_str() {
        "collections" => {
            for name in store.list_collections().await? {
                println!("{name}");
            }
        }
        "insert" => {
            let text = positional(rest, "<text>")?;
            let metadata = parse_meta(&flag_values(rest, "--meta"))?;
            let id = flag_value(rest, "--id").map(str::to_string);
            let id = store.require_active()?.insert(&text, metadata, id).await?;
            println!("{id}");
        }
        "update" => {
            let id = positional(rest, "<id>")?;
            let metadata = parse_meta(&flag_values(rest, "--meta"))?;
            store
                .require_active()?
                .update(&id, flag_value(rest, "--text"), metadata)
                .await?;
        }
        "get" => {
            let id = positional(rest, "<id>")?;
            let record = store.require_active()?.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        "delete" => {
            let id = positional(rest, "<id>")?;
            store.require_active()?.delete(&id).await?;
        }
        "query" => {
            let text = positional(rest, "<text>")?;
            let top_k = match flag_value(rest, "--top-k") {
                Some(raw) => raw.parse().context("--top-k must be a positive integer")?,
                None => DEFAULT_TOP_K,
            };
            let filter = flag_value(rest, "--where")
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()
                .context("--where must be JSON")?;
            let hits = store
                .require_active()?
                .query(&text, top_k, filter.as_ref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }
    Ok(())
}
