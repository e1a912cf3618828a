//! Configuração carregada a partir de `support-gate.toml`.
//!
//! Chaves ausentes usam valores padrão. A variável de ambiente
//! `ANTHROPIC_API_KEY` tem precedência sobre o arquivo.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::capability::{LlmSettings, RetryConfig};
use crate::error::SupportError;

pub const DEFAULT_CONFIG_FILE: &str = "support-gate.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct SupportConfig {
    /// Chave da API Anthropic. Vazia significa modo offline.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Retentativas extras por chamada em caso de falha transitória.
    #[serde(default = "default_capability_retries")]
    pub capability_retries: u32,

    /// Atraso base em milissegundos para backoff exponencial.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Catálogo de pedidos em TOML. Sem ele, usa o catálogo de exemplo embutido.
    #[serde(default)]
    pub orders_file: Option<PathBuf>,
}

fn default_model() -> String {
    LlmSettings::default().model
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_capability_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            capability_retries: default_capability_retries(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            orders_file: None,
        }
    }
}

impl SupportConfig {
    /// Carrega `path` ou, na falta dele, `support-gate.toml` no diretório atual.
    ///
    /// Um caminho explícito precisa existir; o padrão é opcional.
    pub fn load(path: Option<&Path>) -> Result<Self, SupportError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        // Variável de ambiente tem precedência sobre o arquivo para a chave da API.
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, SupportError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SupportError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: SupportConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), SupportError> {
        if self.max_tokens == 0 {
            return Err(SupportError::Config("max_tokens must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(SupportError::Config(format!(
                "temperature {} outside 0.0..=1.0",
                self.temperature
            )));
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.capability_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_values() {
        let config = SupportConfig::default();
        assert_eq!(config.model, "claude-haiku-4-5-20251001");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.capability_retries, 2);
        assert_eq!(config.base_delay_ms, 1000);
        assert!(config.orders_file.is_none());
        assert!(!config.has_api_key());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            api_key = "sk-test-123"
            capability_retries = 4
            orders_file = "orders.toml"
        "#;
        let config: SupportConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_key, "sk-test-123");
        assert_eq!(config.capability_retries, 4);
        assert_eq!(config.orders_file, Some(PathBuf::from("orders.toml")));
        assert_eq!(config.request_timeout_secs, 60);

        let retry = config.retry_config();
        assert_eq!(retry.max_retries, 4);
        assert_eq!(retry.base_delay_ms, 1000);
    }

    #[test]
    fn load_reads_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "model = \"claude-sonnet-4-5\"\nmax_tokens = 512").unwrap();

        let config = SupportConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.model, "claude-sonnet-4-5");
        assert_eq!(config.llm_settings().max_tokens, 512);
    }

    #[test]
    fn load_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SupportConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, SupportError::Config(_)));
    }

    #[test]
    fn load_rejects_out_of_range_temperature() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "temperature = 1.5").unwrap();
        let err = SupportConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }
}
