//! Default values for Casegen configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// LLM Defaults
// ============================================================================

/// Default LLM provider.
pub const DEFAULT_LLM_PROVIDER: &str = "openai";

/// Default max tokens for LLM responses.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// OpenAI defaults
/// Default OpenAI API URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

// Ollama defaults
/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/v1";
/// Default Ollama model.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

// OpenRouter defaults
/// Default OpenRouter API URL.
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";

// ============================================================================
// Generation Defaults
// ============================================================================

/// Engine-imposed timeout for a single LLM call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Upper bound on the number of test cases a single request may ask for.
pub const DEFAULT_MAX_COUNT: usize = 20;

/// Agent identifier recorded as `created_by` on generated test cases.
pub const DEFAULT_AGENT_ID: &str = "casegen-agent";

/// Default test case version.
pub const DEFAULT_TEST_CASE_VERSION: &str = "1.0.0";

/// Default automation status.
pub const DEFAULT_AUTOMATION_STATUS: &str = "not_automated";

// ============================================================================
// Coverage Defaults
// ============================================================================

/// Ideal share of high (and critical) priority tests, in percent.
pub const DEFAULT_IDEAL_HIGH_SHARE: f64 = 30.0;

/// Ideal share of medium priority tests, in percent.
pub const DEFAULT_IDEAL_MEDIUM_SHARE: f64 = 50.0;

/// Ideal share of low priority tests, in percent.
pub const DEFAULT_IDEAL_LOW_SHARE: f64 = 20.0;

/// Allowed deviation from a policy's priority share before it is a gap.
pub const DEFAULT_PRIORITY_TOLERANCE: f64 = 10.0;

/// Below this many tests a recommendation to add more is emitted.
pub const DEFAULT_MIN_RECOMMENDED_TESTS: usize = 5;

/// Below this many distinct test types a recommendation is emitted.
pub const DEFAULT_MIN_DISTINCT_TYPES: usize = 3;

/// High priority share above which the suite is considered top-heavy.
pub const DEFAULT_MAX_HIGH_PRIORITY_SHARE: f64 = 50.0;

/// High priority share below which more high priority tests are suggested.
pub const DEFAULT_MIN_HIGH_PRIORITY_SHARE: f64 = 20.0;

/// Requirement coverage (percent) below which uncovered requirements are listed.
pub const DEFAULT_REQUIREMENT_COVERAGE_THRESHOLD: f64 = 80.0;

/// Edge-case share (percent) below which more edge cases are suggested.
pub const DEFAULT_EDGE_CASE_THRESHOLD: f64 = 15.0;

/// Multiplier turning the edge-case share into a 0-100 sub-score.
pub const DEFAULT_EDGE_CASE_MULTIPLIER: f64 = 5.0;

/// Score delta (points) that counts as an improvement or regression.
pub const DEFAULT_TREND_THRESHOLD: f64 = 5.0;

// ============================================================================
// Knowledge Defaults
// ============================================================================

/// Default knowledge store directory.
pub const DEFAULT_KNOWLEDGE_DIR: &str = ".casegen/knowledge";

/// Default entries subdirectory.
pub const DEFAULT_ENTRIES_DIR: &str = "entries";

/// Default number of similar cases pulled into the prompt context.
pub const DEFAULT_SIMILAR_LIMIT: usize = 5;

// ============================================================================
// Parser Defaults
// ============================================================================

/// Maximum length of the slug part of a generated test case id.
pub const ID_SLUG_LENGTH: usize = 20;

/// Number of characters of the raw response kept by the fallback synthesizer.
pub const FALLBACK_DESCRIPTION_LENGTH: usize = 200;

/// Default error context length in error messages.
pub const DEFAULT_ERROR_CONTEXT_LENGTH: usize = 500;
