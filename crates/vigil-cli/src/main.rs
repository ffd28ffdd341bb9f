//! vigil — personal academic journal monitor.
//! Entry point for the CLI binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vigil_common::Priority;
use vigil_config::Config;
use vigil_db::Database;
use vigil_ingestion::{FeedRegistry, Pipeline, RunOptions};
use vigil_llm::{AnthropicBackend, Translator};

#[derive(Parser)]
#[command(name = "vigil", version, about = "Monitor academic journal feeds")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch feeds, classify, enrich, and translate in one pass.
    Run {
        /// Look-back window in hours for dated entries.
        #[arg(long)]
        hours: Option<i64>,
        /// Skip the translation stage.
        #[arg(long)]
        no_translate: bool,
        /// Skip the abstract enrichment stage.
        #[arg(long)]
        no_enrich: bool,
        /// Fetch every feed in the OPML file, not just academic categories.
        #[arg(long)]
        all_feeds: bool,
    },
    /// Show database statistics.
    Stats,
    /// Fetch missing abstracts for stored articles.
    FetchAbstracts {
        /// Maximum number of articles to enrich.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Re-run keyword classification over every stored article.
    RecheckPriority,
    /// Translate stored priority articles that lack a translation.
    TranslatePriority {
        /// Priority tiers to translate: high, medium, normal.
        #[arg(long, value_delimiter = ',', value_parser = parse_tier,
              default_value = "high,medium")]
        tiers: Vec<Priority>,
    },
}

/// Strict tier parsing: a typo must not silently translate the wrong
/// tier (the store-side `Priority::parse` fallback is for old rows).
fn parse_tier(s: &str) -> Result<Priority, String> {
    match s {
        "high" => Ok(Priority::High),
        "medium" => Ok(Priority::Medium),
        "normal" => Ok(Priority::Normal),
        _ => Err(format!("unknown priority tier '{s}' (expected high, medium, or normal)")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vigil=debug,info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let db = Database::open(&config.paths.database).await?;

    match cli.command {
        Command::Run { hours, no_translate, no_enrich, all_feeds } => {
            let registry = FeedRegistry::from_opml_file(&config.paths.opml_file)?;
            let mut opts = RunOptions::from_config(&config);
            if let Some(hours) = hours {
                opts.hours = hours;
            }
            opts.translate = !no_translate;
            opts.enrich = !no_enrich;
            opts.all_feeds = all_feeds;

            let translator = build_translator(&config);
            let pipeline = Pipeline::new(config, db, translator);
            let summary = pipeline.run(&registry, &opts).await?;
            println!(
                "feeds: {} ({} failed)\ncollected: {}\nnew: {} (high: {}, medium: {})\n\
                 enriched: {}\nreclassified: {}\ntranslated: {}\ntook: {}ms",
                summary.feeds,
                summary.feed_errors,
                summary.collected,
                summary.new,
                summary.high,
                summary.medium,
                summary.enriched,
                summary.reclassified,
                summary.translated,
                summary.duration_ms,
            );
        }
        Command::Stats => {
            let articles = db.articles();
            let stats = articles.stats().await?;
            let abstracts = articles.abstract_stats().await?;
            let journals = db.journals().count().await?;
            println!("journals:        {journals}");
            println!("articles:        {}", stats.total_articles);
            println!("  high priority: {}", stats.high_priority);
            println!("  last 24h:      {}", stats.articles_24h);
            println!("  last 7d:       {}", stats.articles_7d);
            println!("abstracts:       {}/{}", abstracts.with_abstract, abstracts.total);
            println!("  with DOI:      {}", abstracts.with_doi);
            println!("  enrichable:    {}", abstracts.enrichable);
        }
        Command::FetchAbstracts { limit } => {
            let limit = limit.unwrap_or(config.enrichment.limit);
            let pipeline = Pipeline::new(config, db, None);
            let enriched = pipeline.enrich(limit).await?;
            println!("enriched {enriched} articles");
        }
        Command::RecheckPriority => {
            let pipeline = Pipeline::new(config, db, None);
            let updated = pipeline.recheck_priority().await?;
            println!("rechecked priorities, updated {updated} articles");
        }
        Command::TranslatePriority { tiers } => {
            let Some(translator) = build_translator(&config) else {
                anyhow::bail!(
                    "no Anthropic API key configured (set llm.api_key or ANTHROPIC_API_KEY)"
                );
            };
            let pipeline = Pipeline::new(config, db, Some(translator));
            let translated = pipeline.translate(&tiers).await?;
            println!("translated {translated} articles");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tier_is_rejected() {
        let result = Cli::try_parse_from(["vigil", "translate-priority", "--tiers", "bogus"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_translate_priority_defaults_to_high_and_medium() {
        let cli = Cli::try_parse_from(["vigil", "translate-priority"]).unwrap();
        match cli.command {
            Command::TranslatePriority { tiers } => {
                assert_eq!(tiers, vec![Priority::High, Priority::Medium]);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_tier_list_parses() {
        let cli =
            Cli::try_parse_from(["vigil", "translate-priority", "--tiers", "high,normal"]).unwrap();
        match cli.command {
            Command::TranslatePriority { tiers } => {
                assert_eq!(tiers, vec![Priority::High, Priority::Normal]);
            }
            _ => panic!("wrong subcommand"),
        }
    }
}

fn build_translator(config: &Config) -> Option<Translator> {
    match config.anthropic_api_key() {
        Some(key) => {
            info!(model = %config.llm.model, "LLM backend ready");
            let backend = Arc::new(AnthropicBackend::new(key, config.llm.model.clone()));
            Some(Translator::new(
                backend,
                config.llm.max_tokens,
                config.llm.target_language.clone(),
            ))
        }
        None => {
            warn!("no Anthropic API key found (set llm.api_key or ANTHROPIC_API_KEY); translation disabled");
            None
        }
    }
}
