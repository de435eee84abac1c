use casegen_core::config::{
    DEFAULT_KNOWLEDGE_DIR, DEFAULT_LLM_PROVIDER, DEFAULT_MAX_COUNT, DEFAULT_OLLAMA_MODEL,
    DEFAULT_OPENAI_MODEL, DEFAULT_TIMEOUT_SECS, DEFAULT_TREND_THRESHOLD,
};
use casegen_core::config::LLMConfig;
use casegen_core::Config;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.llm.provider, DEFAULT_LLM_PROVIDER);
    assert_eq!(config.generation.max_count, DEFAULT_MAX_COUNT);
    assert_eq!(config.generation.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    assert_eq!(config.coverage.trend_threshold, DEFAULT_TREND_THRESHOLD);
    assert_eq!(config.knowledge.data_dir, DEFAULT_KNOWLEDGE_DIR);
    assert!(config.test_data.endpoint.is_none());
}

#[test]
fn test_config_to_toml() {
    let toml_str = Config::default().to_toml_string();
    assert!(toml_str.contains("[llm]"));
    assert!(toml_str.contains("[generation]"));
    assert!(toml_str.contains("[coverage]"));
    assert!(toml_str.contains("[knowledge]"));
}

#[test]
fn test_config_from_toml() {
    let toml_str = r#"
[llm]
provider = "ollama"
model = "llama3"

[generation]
timeout_secs = 30
max_count = 50

[coverage]
edge_case_threshold = 25.0

[knowledge]
enabled = false
data_dir = ".custom-casegen"

[test_data]
endpoint = "http://localhost:9000"
"#;
    let config = Config::from_toml(toml_str).unwrap();
    assert_eq!(config.llm.provider, "ollama");
    assert_eq!(config.llm.model, Some("llama3".to_string()));
    assert_eq!(config.generation.timeout_secs, 30);
    assert_eq!(config.generation.max_count, 50);
    assert_eq!(config.coverage.edge_case_threshold, 25.0);
    assert_eq!(config.coverage.trend_threshold, DEFAULT_TREND_THRESHOLD);
    assert!(!config.knowledge.enabled);
    assert_eq!(config.knowledge.data_dir, ".custom-casegen");
    assert_eq!(config.test_data.endpoint.as_deref(), Some("http://localhost:9000"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("casegen.toml");
    std::fs::write(&path, "[generation]\nmax_count = 7\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.generation.max_count, 7);
}

#[test]
fn test_config_from_missing_file() {
    assert!(Config::from_file("/nonexistent/casegen.toml").is_err());
}

#[test]
fn test_model_or_default() {
    let mut config = LLMConfig {
        provider: "ollama".to_string(),
        ..Default::default()
    };
    assert_eq!(config.model_or_default(), DEFAULT_OLLAMA_MODEL);

    config.provider = "openai".to_string();
    assert_eq!(config.model_or_default(), DEFAULT_OPENAI_MODEL);

    config.model = Some("custom-model".to_string());
    assert_eq!(config.model_or_default(), "custom-model");
}
