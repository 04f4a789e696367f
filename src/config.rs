use serde::Deserialize;
use std::{fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = ".config/earnings_extract.toml";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub prompt_dir: PathBuf,
    pub tmp_dir: PathBuf,
    /// JSON map of year → SGD-to-USD multiplier.
    pub rates_path: PathBuf,
    pub max_file_size_mb: u64,
    pub llm: LlmSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("store/reports.db"),
            prompt_dir: PathBuf::from("prompt"),
            tmp_dir: PathBuf::from(".tmp"),
            rates_path: PathBuf::from("sgd_usd_rates.json"),
            max_file_size_mb: 25,
            llm: LlmSection::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Hosted OpenAI-compatible gateway, authenticated by API key.
    Openrouter,
    /// Local Ollama server, no key.
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub backend: LlmBackend,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Openrouter,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-oss-20b:free".to_string(),
            temperature: 0.0,
            max_tokens: 50_000,
            api_key_env: "OPENROUTER_API_KEY".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
db_path = "data/earnings.db"

[llm]
backend = "ollama"
base_url = "http://localhost:11434/v1"
model = "qwen3:8b"
"#
        )
        .unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("data/earnings.db"));
        assert_eq!(cfg.prompt_dir, PathBuf::from("prompt"));
        assert_eq!(cfg.max_file_size_mb, 25);
        assert_eq!(cfg.llm.backend, LlmBackend::Ollama);
        assert_eq!(cfg.llm.model, "qwen3:8b");
        assert_eq!(cfg.llm.max_tokens, 50_000);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.llm.backend, LlmBackend::Openrouter);
        assert_eq!(cfg.max_file_size_bytes(), 25 * 1024 * 1024);
    }
}
