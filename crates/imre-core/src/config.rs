use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ImreError, Result};

/// Top-level configuration for the IMRE engine.
///
/// Loaded from `~/.imre/config.toml` by default. Every section falls back to
/// its defaults when absent, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImreConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub assessment: AssessmentConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub response: ResponseConfig,
}

impl ImreConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ImreConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.memory.capacity == 0 {
            return Err(ImreError::Config(
                "memory.capacity must be greater than zero".to_string(),
            ));
        }
        if self.collaborators.timeout_ms == 0 {
            return Err(ImreError::Config(
                "collaborators.timeout_ms must be greater than zero".to_string(),
            ));
        }
        let penalty = self.response.degraded_confidence_penalty;
        if !(penalty > 0.0 && penalty <= 1.0) {
            return Err(ImreError::Config(format!(
                "response.degraded_confidence_penalty must be in (0, 1], got {}",
                penalty
            )));
        }
        if self.response.max_message_len == 0 {
            return Err(ImreError::Config(
                "response.max_message_len must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
        }
    }
}

/// Interview protocol settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Maximum normalized length for a short negative answer to close
    /// complaint collection.
    pub closing_max_len: usize,
    /// Drill down every listed complaint instead of only the main one.
    pub drill_all_complaints: bool,
    /// Idle minutes after which a live session is purged.
    pub session_ttl_minutes: u32,
    /// Stored when the methodology answer is blank.
    pub default_methodology: String,
    /// Stored when the result answer is blank.
    pub default_result: String,
    /// Stored when the evolution answer is blank.
    pub default_evolution: String,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            closing_max_len: 15,
            drill_all_complaints: false,
            session_ttl_minutes: 120,
            default_methodology: "Abordagem clínica padrão do protocolo IMRE".to_string(),
            default_result: "Sem resultados registrados".to_string(),
            default_evolution: "Sem evolução registrada".to_string(),
        }
    }
}

/// Conversation memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Ring buffer capacity (most recent entries kept).
    pub capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Settings applied to every external collaborator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Per-call timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Knowledge search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Only return documents linked to the clinical knowledge base.
    pub linked_only: bool,
    /// Maximum documents per search.
    pub limit: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            linked_only: true,
            limit: 5,
        }
    }
}

/// Reply composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseConfig {
    /// Multiplier applied to the confidence of degraded replies.
    pub degraded_confidence_penalty: f32,
    /// Maximum accepted message length in characters.
    pub max_message_len: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            degraded_confidence_penalty: 0.5,
            max_message_len: 4000,
        }
    }
}
