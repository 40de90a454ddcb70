// Market-intelligence operations used by the screens.
//
// Each call is one `generateContent` round trip. Missing response fields map
// to placeholders; request failures are returned to the caller.

use std::sync::Arc;

use tracing::debug;

use xb2bx_core::config::LlmConfig;
use xb2bx_core::model::Role;

use crate::client::{GenerateRequest, GenerativeModel, LlmError};
use crate::prompt;

/// Shown when research comes back without text.
pub const RESEARCH_UNAVAILABLE: &str = "Intelligence feed unavailable.";

const IMAGE_ASPECT_RATIO: &str = "16:9";

/// A web citation attached to grounded research.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub title: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchResult {
    pub text: String,
    pub sources: Vec<Source>,
}

pub struct MarketIntel {
    model: Arc<dyn GenerativeModel>,
    research_model: String,
    text_model: String,
    image_model: String,
}

impl MarketIntel {
    pub fn new(model: Arc<dyn GenerativeModel>, config: &LlmConfig) -> Self {
        Self {
            model,
            research_model: config.research_model.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    /// Grounded market research for a product or commodity.
    pub async fn research_product(&self, query: &str) -> Result<ResearchResult, LlmError> {
        let request = GenerateRequest::new(&self.research_model, prompt::research_prompt(query))
            .system(prompt::RESEARCH_SYSTEM)
            .with_search();
        let response = self.model.generate(&request).await?;

        let sources: Vec<Source> = response
            .web_chunks()
            .filter(|web| web.uri.as_deref().is_some_and(|u| !u.trim().is_empty()))
            .map(|web| Source {
                title: web.title.clone(),
                uri: web.uri.clone(),
            })
            .collect();
        debug!(sources = sources.len(), "research complete");

        Ok(ResearchResult {
            text: response
                .text()
                .unwrap_or_else(|| RESEARCH_UNAVAILABLE.to_string()),
            sources,
        })
    }

    /// Draft a specification list for an RFQ.
    pub async fn generate_specs(&self, product_name: &str) -> Result<String, LlmError> {
        let request = GenerateRequest::new(&self.text_model, prompt::specs_prompt(product_name))
            .system(prompt::PROCUREMENT_SYSTEM);
        let response = self.model.generate(&request).await?;
        Ok(response.text().unwrap_or_default())
    }

    /// Render a product image. Returns a `data:` URL, or an empty string when
    /// the model sent no image.
    pub async fn generate_product_image(&self, product_name: &str) -> Result<String, LlmError> {
        let request = GenerateRequest::new(&self.image_model, prompt::image_prompt(product_name))
            .aspect_ratio(IMAGE_ASPECT_RATIO);
        let response = self.model.generate(&request).await?;
        Ok(response
            .inline_data()
            .map(|img| format!("data:image/png;base64,{}", img.data))
            .unwrap_or_default())
    }

    pub async fn get_smart_matches(
        &self,
        role: Role,
        interests: &[String],
    ) -> Result<Vec<String>, LlmError> {
        let request = GenerateRequest::new(
            &self.text_model,
            prompt::smart_matches_prompt(role, interests),
        );
        let response = self.model.generate(&request).await?;
        Ok(split_keywords(&response.text().unwrap_or_default()))
    }

    pub async fn get_market_insights(
        &self,
        role: Role,
        rfq_count: usize,
    ) -> Result<String, LlmError> {
        let request = GenerateRequest::new(
            &self.research_model,
            prompt::insights_prompt(role, rfq_count),
        )
        .system(prompt::ADVISOR_SYSTEM);
        let response = self.model.generate(&request).await?;
        Ok(response.text().unwrap_or_default())
    }

    pub async fn analyze_opportunity(&self, product: &str, specs: &str) -> Result<String, LlmError> {
        let request = GenerateRequest::new(
            &self.research_model,
            prompt::opportunity_prompt(product, specs),
        );
        let response = self.model.generate(&request).await?;
        Ok(response.text().unwrap_or_default())
    }
}

/// Split a comma-separated keyword list, dropping blanks.
pub fn split_keywords(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::GenerateResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replies with a fixed response and records every request.
    struct CannedModel {
        reply: Result<serde_json::Value, u16>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl CannedModel {
        fn ok(value: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(value),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn status(code: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(code),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last(&self) -> GenerateRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerativeModel for CannedModel {
        async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(value) => Ok(serde_json::from_value(value.clone()).unwrap()),
                Err(code) => Err(LlmError::Status {
                    status: *code,
                    message: "quota exceeded".into(),
                }),
            }
        }
    }

    fn config() -> LlmConfig {
        LlmConfig {
            endpoint: "https://example.invalid".into(),
            research_model: "research-m".into(),
            text_model: "text-m".into(),
            image_model: "image-m".into(),
        }
    }

    fn text_reply(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[tokio::test]
    async fn research_collects_sources_with_uri() {
        let model = CannedModel::ok(json!({
            "candidates": [{
                "content": {"parts": [{"text": "## Steel outlook"}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "https://a.example", "title": "A"}},
                    {"web": {"title": "orphan"}},
                    {"web": {"uri": "https://b.example"}}
                ]}
            }]
        }));
        let intel = MarketIntel::new(model.clone(), &config());
        let result = intel.research_product("steel").await.unwrap();

        assert_eq!(result.text, "## Steel outlook");
        assert_eq!(
            result.sources,
            vec![
                Source {
                    title: Some("A".into()),
                    uri: Some("https://a.example".into())
                },
                Source {
                    title: None,
                    uri: Some("https://b.example".into())
                },
            ]
        );

        let request = model.last();
        assert_eq!(request.model, "research-m");
        assert!(request.google_search);
        assert_eq!(request.system_instruction.as_deref(), Some(prompt::RESEARCH_SYSTEM));
    }

    #[tokio::test]
    async fn research_with_blank_text_and_uris_degrades() {
        let model = CannedModel::ok(json!({
            "candidates": [{
                "content": {"parts": [{"text": ""}]},
                "groundingMetadata": {"groundingChunks": [
                    {"web": {"uri": "", "title": "blank"}},
                    {"web": {"uri": "   ", "title": "spaces"}}
                ]}
            }]
        }));
        let intel = MarketIntel::new(model, &config());
        let result = intel.research_product("steel").await.unwrap();

        assert_eq!(result.text, RESEARCH_UNAVAILABLE);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn research_without_text_uses_placeholder() {
        let intel = MarketIntel::new(CannedModel::ok(json!({"candidates": []})), &config());
        let result = intel.research_product("steel").await.unwrap();
        assert_eq!(result.text, RESEARCH_UNAVAILABLE);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_returned() {
        let intel = MarketIntel::new(CannedModel::status(429), &config());
        let err = intel.research_product("steel").await.unwrap_err();
        assert!(matches!(err, LlmError::Status { status: 429, .. }));
        assert!(intel.generate_specs("bolts").await.is_err());
    }

    #[tokio::test]
    async fn specs_use_text_model() {
        let model = CannedModel::ok(text_reply("- Grade 8.8"));
        let intel = MarketIntel::new(model.clone(), &config());
        assert_eq!(intel.generate_specs("bolts").await.unwrap(), "- Grade 8.8");
        let request = model.last();
        assert_eq!(request.model, "text-m");
        assert!(!request.google_search);
    }

    #[tokio::test]
    async fn empty_text_operations_return_empty_string() {
        let intel = MarketIntel::new(CannedModel::ok(json!({})), &config());
        assert_eq!(intel.generate_specs("x").await.unwrap(), "");
        assert_eq!(intel.get_market_insights(Role::Buyer, 3).await.unwrap(), "");
        assert_eq!(intel.analyze_opportunity("x", "y").await.unwrap(), "");
        assert!(intel.get_smart_matches(Role::Seller, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_becomes_png_data_url() {
        let model = CannedModel::ok(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Here is your render"},
                {"inlineData": {"mimeType": "image/png", "data": "QUJD"}}
            ]}}]
        }));
        let intel = MarketIntel::new(model.clone(), &config());
        assert_eq!(
            intel.generate_product_image("valve").await.unwrap(),
            "data:image/png;base64,QUJD"
        );
        let request = model.last();
        assert_eq!(request.model, "image-m");
        assert_eq!(request.aspect_ratio.as_deref(), Some("16:9"));
    }

    #[tokio::test]
    async fn image_missing_is_empty() {
        let intel = MarketIntel::new(CannedModel::ok(text_reply("no image")), &config());
        assert_eq!(intel.generate_product_image("valve").await.unwrap(), "");
    }

    #[tokio::test]
    async fn smart_matches_are_trimmed() {
        let intel = MarketIntel::new(CannedModel::ok(text_reply("steel, copper , aluminum")), &config());
        let matches = intel
            .get_smart_matches(Role::Seller, &["metals".to_string()])
            .await
            .unwrap();
        assert_eq!(matches, vec!["steel", "copper", "aluminum"]);
    }

    #[tokio::test]
    async fn insights_use_advisor_persona() {
        let model = CannedModel::ok(text_reply("Copper demand is rising."));
        let intel = MarketIntel::new(model.clone(), &config());
        let text = intel.get_market_insights(Role::Buyer, 4).await.unwrap();
        assert_eq!(text, "Copper demand is rising.");
        let request = model.last();
        assert_eq!(request.model, "research-m");
        assert_eq!(request.system_instruction.as_deref(), Some(prompt::ADVISOR_SYSTEM));
        assert!(request.prompt.contains("4 active RFQs"));
    }

    #[test]
    fn split_keywords_drops_blanks() {
        assert_eq!(split_keywords(" a,, b ,"), vec!["a", "b"]);
        assert!(split_keywords("").is_empty());
    }
}
