pub mod config;
pub mod context;
pub mod coverage;
pub mod engine;
pub mod format;
pub mod knowledge;
pub mod llm;
pub mod model;
pub mod parser;
pub mod testdata;

pub use config::{Config, ConfigError};
pub use coverage::{CoverageAnalyzer, CoverageDelta, CoveragePolicy, CoverageReport};
pub use engine::{GenerationEngine, GenerationRequest, GenerationResponse, Stage};
pub use format::{format_test_cases, FormatOptions, OutputFormat};
pub use llm::{LLMError, OpenAIClient, LLM};
pub use model::{Priority, TestCase, TestStep, TestType};
pub use parser::{parse, parse_response, Format, ParseOutcome};
