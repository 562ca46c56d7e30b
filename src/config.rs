use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub graphrag: GraphRagConfig,
    pub vector_db: VectorDbConfig,
    pub reranker: RerankerConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
}

/// GraphRAG-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GraphRagConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Vector store (DataStax Astra Data API) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VectorDbConfig {
    /// Name of the env var holding the Data API endpoint URL
    #[serde(default = "default_endpoint_env")]
    pub api_endpoint_env: String,
    /// Name of the env var holding the application token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Collection searched by every traversal
    pub collection: String,
    #[serde(default = "default_keyspace")]
    pub keyspace: String,
}

/// Reranker (Pongo) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RerankerConfig {
    #[serde(default = "default_reranker_key_env")]
    pub api_key_env: String,
}

/// Completion model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: String,
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Retries on 429/5xx inside the completion client (never in the engine)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

/// Traversal loop defaults, overridable per invocation from the CLI
#[derive(Debug, Clone, Deserialize)]
pub struct TraversalConfig {
    #[serde(default = "default_max_depth")]
    pub max_recursion_depth: usize,
    #[serde(default = "default_top_k")]
    pub top_k_per_query: usize,
    #[serde(default = "default_queries_per_step")]
    pub queries_per_step: usize,
    /// Candidate count fetched from the vector store before reranking.
    /// Deliberately decoupled from top_k_per_query: retrieval gets recall,
    /// reranking gets precision.
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool_size: usize,
    #[serde(default)]
    pub generate_answer: bool,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: default_max_depth(),
            top_k_per_query: default_top_k(),
            queries_per_step: default_queries_per_step(),
            candidate_pool_size: default_candidate_pool(),
            generate_answer: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_endpoint_env() -> String {
    "DATASTAX_API_ENDPOINT".to_string()
}

fn default_token_env() -> String {
    "DATASTAX_TOKEN".to_string()
}

fn default_keyspace() -> String {
    "default_keyspace".to_string()
}

fn default_reranker_key_env() -> String {
    "PONGO_API_KEY".to_string()
}

fn default_llm_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_retries() -> usize {
    2
}

fn default_max_depth() -> usize {
    3
}

fn default_top_k() -> usize {
    2
}

fn default_queries_per_step() -> usize {
    2
}

fn default_candidate_pool() -> usize {
    200
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in GRAPHRAG_CONFIG environment variable
    /// 2. ./config.toml in current directory
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("GRAPHRAG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&config_str)
            .context("Failed to parse config.toml")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        // All three backing services need credentials before a traversal can run.
        // dotenv was already loaded in Config::load, so .env values count.
        for env_name in [
            &self.vector_db.api_endpoint_env,
            &self.vector_db.token_env,
            &self.reranker.api_key_env,
            &self.llm.api_key_env,
        ] {
            std::env::var(env_name).with_context(|| {
                format!(
                    "Environment variable {} not set. Set it in your .env file or as an environment variable.",
                    env_name
                )
            })?;
        }

        if self.vector_db.collection.trim().is_empty() {
            anyhow::bail!("vector_db.collection must not be empty");
        }

        if self.traversal.top_k_per_query == 0 {
            anyhow::bail!("traversal.top_k_per_query must be greater than 0");
        }

        if self.traversal.queries_per_step == 0 {
            anyhow::bail!("traversal.queries_per_step must be greater than 0");
        }

        if self.traversal.candidate_pool_size == 0 {
            anyhow::bail!("traversal.candidate_pool_size must be greater than 0");
        }

        if self.llm.temperature < 0.0 || self.llm.temperature > 2.0 {
            anyhow::bail!("llm.temperature must be between 0.0 and 2.0");
        }

        Ok(())
    }

    /// Read a credential named by an `*_env` config field
    pub fn env_credential(&self, env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable {} not set", env_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env vars so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    const CRED_VARS: [&str; 4] = [
        "DATASTAX_API_ENDPOINT",
        "DATASTAX_TOKEN",
        "PONGO_API_KEY",
        "OPENAI_API_KEY",
    ];

    fn test_config_toml() -> &'static str {
        r#"
[graphrag]
log_level = "debug"

[vector_db]
collection = "hotpot_qa"

[reranker]

[llm]
model = "gpt-4o"

[traversal]
max_recursion_depth = 3
top_k_per_query = 2
queries_per_step = 2
"#
    }

    fn with_config_env(config_path: &std::path::Path, creds: bool, f: impl FnOnce()) {
        let original_config = std::env::var("GRAPHRAG_CONFIG").ok();
        let originals: Vec<_> = CRED_VARS.iter().map(|v| std::env::var(v).ok()).collect();
        std::env::set_var("GRAPHRAG_CONFIG", config_path.to_str().unwrap());
        for var in CRED_VARS {
            if creds {
                std::env::set_var(var, "test-value");
            } else {
                std::env::remove_var(var);
            }
        }
        f();
        std::env::remove_var("GRAPHRAG_CONFIG");
        for var in CRED_VARS {
            std::env::remove_var(var);
        }
        if let Some(val) = original_config {
            std::env::set_var("GRAPHRAG_CONFIG", val);
        }
        for (var, original) in CRED_VARS.iter().zip(originals) {
            if let Some(val) = original {
                std::env::set_var(var, val);
            }
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, test_config_toml()).unwrap();
        with_config_env(&config_path, true, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.graphrag.log_level, "debug");
            assert_eq!(config.vector_db.collection, "hotpot_qa");
            assert_eq!(config.vector_db.keyspace, "default_keyspace");
            assert_eq!(config.llm.model, "gpt-4o");
            assert_eq!(config.traversal.max_recursion_depth, 3);
            assert_eq!(config.traversal.candidate_pool_size, 200);
            assert!(!config.traversal.generate_answer);
        });
    }

    #[test]
    fn test_config_missing_credentials() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, test_config_toml()).unwrap();
        with_config_env(&config_path, false, || {
            let config = Config::load();
            assert!(config.is_err(), "Expected missing credential error");
            assert!(config
                .unwrap_err()
                .to_string()
                .contains("DATASTAX_API_ENDPOINT"));
        });
    }

    #[test]
    fn test_config_rejects_zero_top_k() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let toml = test_config_toml().replace("top_k_per_query = 2", "top_k_per_query = 0");
        fs::write(&config_path, toml).unwrap();
        with_config_env(&config_path, true, || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("top_k_per_query"));
        });
    }

    #[test]
    fn test_config_invalid_path() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let original = std::env::var("GRAPHRAG_CONFIG").ok();
        std::env::set_var("GRAPHRAG_CONFIG", "nonexistent.toml");
        let config = Config::load();
        assert!(config.is_err());
        std::env::remove_var("GRAPHRAG_CONFIG");
        if let Some(v) = original {
            std::env::set_var("GRAPHRAG_CONFIG", v);
        }
    }
}
