mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use luna_core::{MemoryId, MemoryRecord};
use luna_store::{
    CONFIG_FILE, Consciousness, Store, default_data_dir, load_config, load_config_or_default,
    open_data_dir,
};
use rmcp::{ServiceExt, transport::stdio};

#[derive(Parser)]
#[command(name = "luna", about = "Associative memory and affect engine CLI and MCP server")]
struct Cli {
    /// TOML config file (default: luna.toml in the data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Remember an input and update affect
    Process {
        /// Input text
        text: String,

        /// Language tag of the input
        #[arg(long, default_value = "en")]
        lang: String,
    },

    /// Rank memories by similarity to a text
    Similar {
        /// Text to compare against
        text: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Case-insensitive substring search over memory content
    Search {
        /// Substring to look for
        query: String,
    },

    /// Show one memory as JSON
    Get {
        /// Memory id
        id: i64,
    },

    /// List important memories
    Important,

    /// Show the current affect state
    Affect,

    /// Merge near-duplicate memories
    Consolidate,

    /// Show store statistics
    Stats,

    /// Export memories and affect to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Import memories from a JSON file
    Import {
        /// Input file path
        path: PathBuf,
    },
}

fn open_consciousness(cli: &Cli) -> Result<Consciousness<Store>> {
    let data_dir = default_data_dir();
    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => load_config_or_default(&data_dir.join(CONFIG_FILE))
            .context("failed to load config")?,
    };
    let store = open_data_dir(&data_dir).context("failed to open memory store")?;
    let mut consciousness =
        Consciousness::from_config(store, &config).context("failed to load memories")?;
    consciousness
        .restore_session()
        .context("failed to restore affect state")?;
    Ok(consciousness)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Serve => cmd_serve(&cli).await,
        Commands::Process { text, lang } => cmd_process(&cli, text, lang),
        Commands::Similar { text, limit } => cmd_similar(&cli, text, *limit),
        Commands::Search { query } => cmd_search(&cli, query),
        Commands::Get { id } => cmd_get(&cli, MemoryId(*id)),
        Commands::Important => cmd_important(&cli),
        Commands::Affect => cmd_affect(&cli),
        Commands::Consolidate => cmd_consolidate(&cli),
        Commands::Stats => cmd_stats(&cli),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
    }
}

async fn cmd_serve(cli: &Cli) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    tracing::info!(
        memories = consciousness.memory().len(),
        "starting MCP server"
    );

    let server = server::LunaServer::new(consciousness);
    let service = server
        .clone()
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;

    server.persist().await;
    Ok(())
}

fn print_record(record: &MemoryRecord) {
    println!(
        "#{:<5} {:.2}  [{}]  {}",
        record.id.0, record.importance, record.language, record.content
    );
}

fn cmd_process(cli: &Cli, text: &str, lang: &str) -> Result<()> {
    let mut consciousness = open_consciousness(cli)?;
    let outcome = consciousness
        .process_input(text, lang)
        .context("failed to process input")?;
    consciousness
        .persist_session()
        .context("failed to save affect state")?;

    println!(
        "stored memory #{} (importance {:.2}, sentiment {:.2}, mood {:.2})",
        outcome.id, outcome.importance, outcome.sentiment, outcome.mood
    );
    if let Some(report) = outcome.consolidation {
        println!(
            "consolidated: {} similar pairs, {} updated, {} failed",
            report.similar_pairs, report.updated, report.failed
        );
    }
    Ok(())
}

fn cmd_similar(cli: &Cli, text: &str, limit: usize) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    let ranked = consciousness.find_similar_memories(text, limit);
    if ranked.is_empty() {
        println!("(no memories found)");
    }
    for scored in ranked {
        println!(
            "{:.3}  #{:<5} {}",
            scored.score, scored.record.id.0, scored.record.content
        );
    }
    Ok(())
}

fn cmd_search(cli: &Cli, query: &str) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    let hits = consciousness.search_memories(query);
    if hits.is_empty() {
        println!("(no memories found)");
    }
    hits.into_iter().for_each(print_record);
    Ok(())
}

fn cmd_get(cli: &Cli, id: MemoryId) -> Result<()> {
    let mut consciousness = open_consciousness(cli)?;
    let record = consciousness
        .get_memory(id)
        .context("failed to read memory")?
        .with_context(|| format!("memory {id} not found"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_important(cli: &Cli) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    let important = consciousness.important_memories();
    if important.is_empty() {
        println!("(no important memories)");
    }
    important.into_iter().for_each(print_record);
    Ok(())
}

fn cmd_affect(cli: &Cli) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&consciousness.affect_state())?
    );
    Ok(())
}

fn cmd_consolidate(cli: &Cli) -> Result<()> {
    let mut consciousness = open_consciousness(cli)?;
    let report = consciousness.consolidate();
    println!(
        "examined {} pairs: {} similar, {} updated, {} failed",
        report.pairs_examined, report.similar_pairs, report.updated, report.failed
    );
    Ok(())
}

fn cmd_stats(cli: &Cli) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    let stats = consciousness.memory().stats();
    let affect = consciousness.affect_state();

    println!("memories:     {}", stats.records);
    println!("important:    {}", stats.important);
    println!("associations: {}", stats.associations);
    println!("mood:         {:.2}", affect.mood);
    println!("languages:    {}", affect.language_fluency.len());
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let consciousness = open_consciousness(cli)?;
    consciousness
        .export_json_file(path)
        .context("failed to export JSON")?;

    println!(
        "exported {} memories to {}",
        consciousness.memory().len(),
        path.display()
    );
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let mut consciousness = open_consciousness(cli)?;
    let report = consciousness
        .import_json_file(path)
        .context("failed to import JSON")?;
    consciousness
        .persist_session()
        .context("failed to save affect state")?;

    println!(
        "imported {} memories from {} ({} associations, {} dropped)",
        report.imported,
        path.display(),
        report.associations,
        report.dropped
    );
    Ok(())
}
