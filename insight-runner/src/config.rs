//! Configuration for the insight runner.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use crate::dispatch::ModelId;

/// Main configuration structure for the insight runner.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub offload: OffloadConfig,
    #[serde(default)]
    pub engines: EnginesConfig,
    /// Engine-side model tags for each dispatchable model.
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Worker pool for blocking inference jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct OffloadConfig {
    /// Number of long-lived worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnginesConfig {
    #[serde(default)]
    pub ollama: OllamaEngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaEngineConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Per-request timeout; generation on CPU-only hosts can take minutes.
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for OllamaEngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_url(),
            timeout_secs: default_request_timeout(),
        }
    }
}

/// Maps each dispatchable model to the tag the engine serves it under.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_medgemma_tag")]
    pub medgemma: String,
    #[serde(default = "default_clara_tag")]
    pub clara_nv_reason_cxr_3b: String,
}

impl ModelsConfig {
    /// The engine tag serving `model`.
    pub fn engine_model(&self, model: ModelId) -> &str {
        match model {
            ModelId::MedGemma => &self.medgemma,
            ModelId::ClaraNvReasonCxr3b => &self.clara_nv_reason_cxr_3b,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            medgemma: default_medgemma_tag(),
            clara_nv_reason_cxr_3b: default_clara_tag(),
        }
    }
}

/// Lung segmentation runs an external command against a model checkpoint.
///
/// The command is invoked as
/// `<command> <args...> --model <model_path> --input <json> --output <json>`
/// where both JSON files hold a wire image.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    #[serde(default = "default_segmentation_model")]
    pub model_path: String,
    #[serde(default = "default_segmentation_command")]
    pub command: String,
    #[serde(default = "default_segmentation_args")]
    pub args: Vec<String>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            model_path: default_segmentation_model(),
            command: default_segmentation_command(),
            args: default_segmentation_args(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    4014
}
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(4)
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_request_timeout() -> u64 {
    600
}
fn default_medgemma_tag() -> String {
    "medgemma-4b-it".to_string()
}
fn default_clara_tag() -> String {
    "nvidia-reason-cxr-3b".to_string()
}
fn default_segmentation_model() -> String {
    "./segmentLungsModel-v1.0.ckpt".to_string()
}
fn default_segmentation_command() -> String {
    "python3".to_string()
}
fn default_segmentation_args() -> Vec<String> {
    vec!["segment_lungs.py".to_string()]
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (INSIGHT__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("api.host", default_host())?
            .set_default("api.port", default_port() as i64)?
            .set_default("offload.workers", default_workers() as i64)?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("INSIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_api_config() {
        let api = ApiConfig::default();
        assert_eq!(api.host, "0.0.0.0");
        assert_eq!(api.port, 4014);
    }

    #[test]
    fn test_default_workers_is_bounded() {
        let offload = OffloadConfig::default();
        assert!(offload.workers >= 1);
        assert!(offload.workers <= 4);
    }

    #[test]
    fn test_default_segmentation_config() {
        let segmentation = SegmentationConfig::default();
        assert_eq!(segmentation.model_path, "./segmentLungsModel-v1.0.ckpt");
        assert_eq!(segmentation.command, "python3");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = ConfigLoader::builder()
            .add_source(File::from_str(
                "[engines.ollama]\nbase_url = \"http://gpu-box:11434\"\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.engines.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.engines.ollama.timeout_secs, 600);
        assert_eq!(config.models.medgemma, "medgemma-4b-it");
        assert_eq!(config.api.port, 4014);
    }

    #[test]
    fn test_engine_model_per_dispatchable_model() {
        let models = ModelsConfig::default();
        assert_eq!(models.engine_model(ModelId::MedGemma), "medgemma-4b-it");
        assert_eq!(
            models.engine_model(ModelId::ClaraNvReasonCxr3b),
            "nvidia-reason-cxr-3b"
        );
    }
}
