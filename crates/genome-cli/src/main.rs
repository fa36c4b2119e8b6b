mod analyze;
mod chat;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use genome_analysis::{AnalysisPipeline, BrandResolver, GenomeAnalyzer, PipelineSettings, ReportCache};
use genome_chat::{ChatManager, ChatSettings};
use genome_core::AppConfig;
use genome_llm::{CompletionProvider, OpenAiClient};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "genome-cli")]
#[command(about = "Market Genome command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full analysis for a brand and print the report.
    Analyze {
        /// Brand name, website or social handle.
        brand: String,
        /// Also send the report to this address.
        #[arg(long)]
        email: Option<String>,
        /// Print the report as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
    /// Chat with the marketing assistant about a brand.
    Chat {
        brand: String,
    },
}

/// Collaborators shared by both commands.
struct Services {
    analyzer: GenomeAnalyzer,
    cache: Arc<ReportCache>,
    provider: Arc<dyn CompletionProvider>,
}

impl Services {
    fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let provider: Arc<dyn CompletionProvider> = Arc::new(
            OpenAiClient::from_config(config)
                .map_err(|e| anyhow::anyhow!("failed to build provider client: {e}"))?,
        );
        let resolver = if config.resolve_websites {
            BrandResolver::new(config.provider_timeout_secs)?
        } else {
            BrandResolver::offline()
        };
        let cache = Arc::new(ReportCache::new());
        let pipeline =
            AnalysisPipeline::new(Arc::clone(&provider), PipelineSettings::from_config(config));
        Ok(Self {
            analyzer: GenomeAnalyzer::new(resolver, pipeline, Arc::clone(&cache)),
            cache,
            provider,
        })
    }

    fn chat_manager(&self, config: &AppConfig) -> ChatManager {
        ChatManager::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.cache),
            ChatSettings::from_config(config),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = genome_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let services = Services::from_config(&config)?;

    match cli.command {
        Commands::Analyze { brand, email, json } => {
            analyze::run_analyze(&config, &services.analyzer, &brand, email.as_deref(), json).await
        }
        Commands::Chat { brand } => {
            let manager = services.chat_manager(&config);
            chat::run_chat(&manager, &brand).await
        }
    }
}
