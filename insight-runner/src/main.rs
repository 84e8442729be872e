//! VolView Insight runner - serves LLM analysis and lung segmentation to the viewer.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use insight_runner::adapters::{CommandSegmentationAdapter, LlmAdapter, OllamaLlmAdapter};
use insight_runner::api;
use insight_runner::codec::VtkImageCodec;
use insight_runner::config::Config;
use insight_runner::dispatch::{DispatchTable, ModelId};
use insight_runner::offload::OffloadPool;
use insight_runner::orchestrator::Orchestrator;
use insight_runner::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    println!("volview-insight-runner {}", VERSION);
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator, Box<dyn std::error::Error>> {
    let ollama = &config.engines.ollama;
    let timeout = Duration::from_secs(ollama.timeout_secs);

    let adapters: Vec<Arc<dyn LlmAdapter>> = ModelId::ALL
        .iter()
        .map(|&model| {
            let engine_model = config.models.engine_model(model);
            tracing::info!(
                model = %model,
                engine_model = %engine_model,
                "Registered Ollama adapter at {}",
                ollama.base_url
            );
            Arc::new(OllamaLlmAdapter::new(model, &ollama.base_url, engine_model, timeout))
                as Arc<dyn LlmAdapter>
        })
        .collect();
    let dispatch = DispatchTable::new(adapters)?;

    let segmenter = CommandSegmentationAdapter::from_config(&config.segmentation);
    if !segmenter.model_path().exists() {
        tracing::warn!(
            model_path = %segmenter.model_path().display(),
            "Lung segmentation checkpoint not found; segmentation requests will fail until it is installed"
        );
    }

    let pool = OffloadPool::new(config.offload.workers)?;

    Ok(Orchestrator::new(
        Arc::new(dispatch),
        Arc::new(segmenter),
        Arc::new(pool),
        Arc::new(VtkImageCodec),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle --version / -V
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        print_version();
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().map_err(|e| format!("Failed to load configuration: {}", e))?;
    tracing::info!("Starting volview-insight-runner {}", VERSION);

    let orchestrator = build_orchestrator(&config)?;
    let addr = format!("{}:{}", config.api.host, config.api.port);
    let state = Arc::new(AppState::new(orchestrator));

    let app = api::app(state);

    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
