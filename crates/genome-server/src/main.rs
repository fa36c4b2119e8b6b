mod api;
mod jobs;
mod middleware;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::sync::Arc;

use genome_analysis::{AnalysisPipeline, BrandResolver, GenomeAnalyzer, PipelineSettings, ReportCache};
use genome_chat::{ChatManager, ChatSettings};
use genome_dispatch::{mailer_from_config, ReportDispatcher};
use genome_llm::{CompletionProvider, OpenAiClient};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    jobs::{JobRunner, JobStore},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(genome_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiClient::from_config(&config)?);
    let resolver = if config.resolve_websites {
        BrandResolver::new(config.provider_timeout_secs)?
    } else {
        BrandResolver::offline()
    };
    let cache = Arc::new(ReportCache::new());
    let pipeline = AnalysisPipeline::new(Arc::clone(&provider), PipelineSettings::from_config(&config));
    let analyzer = Arc::new(GenomeAnalyzer::new(resolver, pipeline, Arc::clone(&cache)));
    let chat = Arc::new(ChatManager::new(
        provider,
        cache,
        ChatSettings::from_config(&config),
    ));
    let dispatcher = ReportDispatcher::new(mailer_from_config(&config)?);
    let jobs = Arc::new(JobStore::new());

    let _scheduler = scheduler::build_scheduler(Arc::clone(&chat), Arc::clone(&jobs)).await?;

    let auth = AuthState::from_env(matches!(config.env, genome_core::Environment::Development))?;
    let state = AppState::new(JobRunner {
        jobs,
        analyzer,
        chat,
        dispatcher,
    });
    let app = build_app(state, auth, default_rate_limit_state());

    tracing::info!(addr = %config.bind_addr, env = %config.env, "genome server listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
