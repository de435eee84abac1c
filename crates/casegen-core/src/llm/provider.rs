use super::{LLMError, OpenAIClient, LLM};
use crate::config::{
    LLMConfig, DEFAULT_MAX_TOKENS, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, DEFAULT_OPENAI_MODEL,
    DEFAULT_OPENAI_URL, DEFAULT_OPENROUTER_URL, DEFAULT_TEMPERATURE,
};

/// LLM Provider configuration.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI-compatible endpoint (default, most universal)
    OpenAI {
        base_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    },
    /// OpenRouter, which needs its own key
    OpenRouter {
        api_key: Option<String>,
        model: Option<String>,
    },
    /// Local Ollama instance
    Ollama {
        base_url: Option<String>,
        model: String,
    },
}

impl Default for Provider {
    fn default() -> Self {
        Provider::OpenAI {
            base_url: None,
            api_key: None,
            model: None,
        }
    }
}

impl Provider {
    /// Creates a provider from LLMConfig.
    pub fn from_config(config: &LLMConfig) -> Self {
        match config.provider.as_str() {
            "ollama" => Provider::Ollama {
                base_url: config.base_url.clone(),
                model: config.model_or_default(),
            },
            "openrouter" => Provider::OpenRouter {
                api_key: config.api_key_or_env(),
                model: config.model.clone(),
            },
            _ => Provider::OpenAI {
                base_url: config.base_url.clone(),
                api_key: config.api_key_or_env(),
                model: config.model.clone(),
            },
        }
    }

    /// Builds a client with token and temperature limits taken from config.
    pub fn build_with(self, config: &LLMConfig) -> Result<Box<dyn LLM>, LLMError> {
        self.build_client(config.max_tokens, config.temperature)
    }

    /// Creates an LLM client from the provider configuration.
    pub fn build(self) -> Result<Box<dyn LLM>, LLMError> {
        self.build_client(DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE)
    }

    fn build_client(self, max_tokens: u32, temperature: f32) -> Result<Box<dyn LLM>, LLMError> {
        let client = match self {
            Provider::OpenAI {
                base_url,
                api_key,
                model,
            } => {
                let base = base_url
                    .or_else(|| std::env::var("CASEGEN_LLM_BASE_URL").ok())
                    .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
                    .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());

                let key = api_key
                    .or_else(|| std::env::var("CASEGEN_LLM_API_KEY").ok())
                    .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                    .unwrap_or_default();

                let mdl = model
                    .or_else(|| std::env::var("CASEGEN_LLM_MODEL").ok())
                    .or_else(|| std::env::var("OPENAI_MODEL").ok())
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

                OpenAIClient::new(base, key, mdl)
            }

            Provider::OpenRouter { api_key, model } => {
                let key = api_key
                    .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                    .ok_or(LLMError::MissingApiKey)?;
                let mdl = model.ok_or_else(|| {
                    LLMError::MissingConfig("llm.model is required for openrouter".to_string())
                })?;

                let client = OpenAIClient::new(DEFAULT_OPENROUTER_URL, key, mdl.clone());
                client.with_label(format!("openrouter/{mdl}"))
            }

            Provider::Ollama { base_url, model } => {
                let base = base_url
                    .or_else(|| {
                        std::env::var("OLLAMA_HOST")
                            .ok()
                            .map(|h| format!("{}/v1", h.trim_end_matches('/')))
                    })
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

                OpenAIClient::new(base, "", model.clone()).with_label(format!("ollama/{model}"))
            }
        };

        Ok(Box::new(
            client
                .with_max_tokens(max_tokens)
                .with_temperature(temperature),
        ))
    }

    /// Auto-detect provider from environment variables.
    ///
    /// Detection order:
    /// 1. CASEGEN_LLM_PROVIDER explicitly set
    /// 2. CASEGEN_LLM_BASE_URL or OPENAI_API_KEY set → OpenAI-compatible
    /// 3. OPENROUTER_API_KEY set → OpenRouter (model from CASEGEN_LLM_MODEL)
    /// 4. OLLAMA_HOST set → Ollama
    /// 5. Default to OpenAI-compatible (works with local servers too)
    pub fn from_env() -> Result<Box<dyn LLM>, LLMError> {
        let ollama_model = || {
            std::env::var("CASEGEN_LLM_MODEL")
                .or_else(|_| std::env::var("OLLAMA_MODEL"))
                .unwrap_or_else(|_| DEFAULT_OLLAMA_MODEL.to_string())
        };

        if let Ok(provider) = std::env::var("CASEGEN_LLM_PROVIDER") {
            return match provider.to_lowercase().as_str() {
                "openai" => Provider::default().build(),
                "openrouter" => Provider::OpenRouter {
                    api_key: None,
                    model: std::env::var("CASEGEN_LLM_MODEL").ok(),
                }
                .build(),
                "ollama" => Provider::Ollama {
                    base_url: None,
                    model: ollama_model(),
                }
                .build(),
                other => Err(LLMError::UnknownProvider(other.to_string())),
            };
        }

        if std::env::var("CASEGEN_LLM_BASE_URL").is_ok() || std::env::var("OPENAI_API_KEY").is_ok()
        {
            return Provider::default().build();
        }

        if std::env::var("OPENROUTER_API_KEY").is_ok() {
            return Provider::OpenRouter {
                api_key: None,
                model: std::env::var("CASEGEN_LLM_MODEL").ok(),
            }
            .build();
        }

        if std::env::var("OLLAMA_HOST").is_ok() {
            return Provider::Ollama {
                base_url: None,
                model: ollama_model(),
            }
            .build();
        }

        Provider::default().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_provider() {
        let provider = Provider::default();
        assert!(matches!(provider, Provider::OpenAI { .. }));
    }

    #[test]
    fn test_ollama_provider_build() {
        let provider = Provider::Ollama {
            base_url: Some("http://localhost:11434/v1".to_string()),
            model: "llama3".to_string(),
        };
        let llm = provider.build().unwrap();
        assert_eq!(llm.name(), "ollama/llama3");
    }

    #[test]
    fn test_openrouter_requires_model() {
        let provider = Provider::OpenRouter {
            api_key: Some("key".to_string()),
            model: None,
        };
        assert!(matches!(provider.build(), Err(LLMError::MissingConfig(_))));
    }

    #[test]
    fn test_from_config() {
        let config = LLMConfig {
            provider: "ollama".to_string(),
            model: Some("codellama".to_string()),
            ..LLMConfig::default()
        };

        let provider = Provider::from_config(&config);
        assert!(matches!(provider, Provider::Ollama { model, .. } if model == "codellama"));
    }
}
