use std::path::{Path, PathBuf};
use std::sync::Arc;
use supportrag::cli::{Cli, Commands, ConfigAction};
use supportrag::config::Config;
use supportrag::embedding::FastEmbedProvider;
use supportrag::engine::{InitOutcome, RetrievalEngine};
use supportrag::error::{Result, SupportError};
use supportrag::tools::SupportTools;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Init => cmd_init(cli.config),
        Commands::Rebuild => cmd_rebuild(cli.config),
        Commands::Search { query, k, json } => cmd_search(cli.config, &query, k, json),
        Commands::Faq {
            query,
            threshold,
            k,
            json,
        } => cmd_faq(cli.config, &query, threshold, k, json),
        Commands::Order { order_id, summary } => cmd_order(cli.config, &order_id, summary),
        Commands::Refund { order_id, reason } => cmd_refund(cli.config, &order_id, &reason),
        Commands::Restaurant { name } => cmd_restaurant(cli.config, &name),
        Commands::Escalate { issue } => cmd_escalate(cli.config, &issue),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_filter = if verbose {
        "supportrag=debug"
    } else {
        "supportrag=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Construct the encoder and engine without loading anything
fn open_engine(config: &Config) -> Result<Arc<RetrievalEngine>> {
    let provider = Arc::new(FastEmbedProvider::new(&config.embedding.model)?);
    Ok(Arc::new(RetrievalEngine::from_config(config, provider)?))
}

/// Open the engine and bring it to ready
fn start_engine(config: &Config) -> Result<Arc<RetrievalEngine>> {
    let engine = open_engine(config)?;

    match engine.initialize()? {
        InitOutcome::Loaded { entries } => {
            tracing::info!("Loaded persisted index ({} entries)", entries)
        }
        InitOutcome::Built {
            entries,
            persisted: false,
        } => tracing::warn!("Built index ({} entries) but could not persist it", entries),
        InitOutcome::Built { entries, .. } => {
            tracing::info!("Built and saved new index ({} entries)", entries)
        }
        InitOutcome::AlreadyReady => {}
    }

    Ok(engine)
}

fn support_tools(config: &Config) -> Result<SupportTools> {
    Ok(SupportTools::from_config(config, start_engine(config)?))
}

fn cmd_init(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = start_engine(&config)?;

    println!("✓ Retrieval engine ready");
    println!("  Entries: {}", engine.entry_count().unwrap_or(0));
    println!("  Index:   {}", engine.store().index_path().display());
    println!("  Stored:  {}", engine.store().entries_path().display());
    Ok(())
}

fn cmd_rebuild(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    // Skips initialize; rebuild publishes its own pair
    let engine = open_engine(&config)?;

    let entries = engine.rebuild()?;
    println!("✓ Rebuilt index with {} entries", entries);
    Ok(())
}

fn cmd_search(config_path: Option<PathBuf>, query: &str, k: usize, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let engine = start_engine(&config)?;
    let results = engine.search(query, k)?;

    if json {
        let rows: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "row": r.row,
                    "score": r.score,
                    "entry": r.entry,
                })
            })
            .collect();
        print_json(&rows)?;
    } else if results.is_empty() {
        println!("No results");
    } else {
        for (rank, result) in results.iter().enumerate() {
            println!(
                "{}. [{:.3}] {}\n   {}",
                rank + 1,
                result.score,
                result.entry.question,
                result.entry.answer
            );
        }
    }
    Ok(())
}

fn cmd_faq(
    config_path: Option<PathBuf>,
    query: &str,
    threshold: Option<f32>,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let tools = SupportTools::new(
        start_engine(&config)?,
        Vec::new(),
        Vec::new(),
        threshold.unwrap_or(config.retrieval.relevance_threshold),
        k.unwrap_or(config.retrieval.default_k),
    );

    let response = tools.search_faq(query)?;
    if json {
        print_json(&response)?;
    } else {
        println!("{}", response.message);
        for faq in &response.faqs {
            println!(
                "\n[{:.3}] {}\n{}",
                faq.similarity_score, faq.entry.question, faq.entry.answer
            );
        }
    }
    Ok(())
}

fn cmd_order(config_path: Option<PathBuf>, order_id: &str, summary: bool) -> Result<()> {
    let tools = support_tools(&load_config(config_path)?)?;

    if summary {
        match tools.get_order_summary(order_id) {
            Some(summary) => println!("{}", summary.summary),
            None => println!("Order {} not found.", order_id),
        }
        return Ok(());
    }

    match tools.track_order(order_id) {
        Some(tracking) => {
            print_json(&tracking)?;
            if let Some(status) = tools.check_delivery_time(order_id) {
                println!("{}", status.message());
            }
        }
        None => println!(
            "Order {} not found. Please check your order ID and try again.",
            order_id
        ),
    }
    Ok(())
}

fn cmd_refund(config_path: Option<PathBuf>, order_id: &str, reason: &str) -> Result<()> {
    let tools = support_tools(&load_config(config_path)?)?;
    match tools.process_refund(order_id, reason) {
        Some(decision) => println!("{}", decision.message),
        None => println!("Order {} not found.", order_id),
    }
    Ok(())
}

fn cmd_restaurant(config_path: Option<PathBuf>, name: &str) -> Result<()> {
    let tools = support_tools(&load_config(config_path)?)?;
    match tools.get_restaurant_info(name) {
        Some(restaurant) => print_json(restaurant)?,
        None => println!("Restaurant '{}' not found in our database.", name),
    }
    Ok(())
}

fn cmd_escalate(config_path: Option<PathBuf>, issue: &str) -> Result<()> {
    let tools = support_tools(&load_config(config_path)?)?;
    let ticket = tools.escalate_to_human(issue);

    println!("{}", ticket.message);
    for method in &ticket.contact_methods {
        println!("  - {}", method);
    }
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let content = toml::to_string_pretty(&config)?;
            println!("{}", content);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SupportError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path()?.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found at {}, using defaults. Run 'supportrag config init' to create one.",
            path.display()
        );
        return expand_config_paths(Config::default().resolve()?);
    }

    expand_config_paths(Config::load(&path)?)
}

fn expand_config_paths(mut config: Config) -> Result<Config> {
    config.index.path = expand_path(&config.index.path)?;
    config.sources.faq_file = expand_path(&config.sources.faq_file)?;
    config.sources.order_file = expand_path(&config.sources.order_file)?;
    config.sources.restaurant_file = expand_path(&config.sources.restaurant_file)?;
    Ok(config)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| SupportError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| SupportError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| SupportError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
