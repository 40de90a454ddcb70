// Generative-AI layer: the Gemini REST client, prompt templates, and the
// market-intelligence operations the screens call.

pub mod client;
pub mod intel;
pub mod prompt;
pub mod wire;

pub use client::{GeminiClient, GenerativeModel, LlmClient, LlmError};
pub use intel::{MarketIntel, ResearchResult, Source};
