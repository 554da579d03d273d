//! Gemini REST client: daily digest and narration audio.

use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use url::Url;

use super::{DigestProvider, TtsProvider, strip_code_fence};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::review::StructuredReview;

/// Shared HTTP plumbing for both Gemini models.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.gemini_endpoint,
            config.gemini_api_key.clone(),
            config.request_timeout(),
        )
    }

    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn model_url(&self, model: &str) -> anyhow::Result<Url> {
        Url::parse(&format!("{}/models/{}:generateContent", self.endpoint, model))
            .context("Invalid Gemini endpoint")
    }

    /// POST a `generateContent` request and return the decoded JSON body.
    async fn generate_content(&self, model: &str, body: &Value) -> anyhow::Result<Value> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("GEMINI_API_KEY not set"))?;
        let url = self.model_url(model)?;

        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", key)
            .json(body)
            .send()
            .await
            .context("Request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            anyhow::bail!("HTTP Error: {} {}", status, detail.trim());
        }
        resp.json::<Value>().await.context("JSON parse error")
    }
}

// ======================== Digest ========================

pub struct GeminiDigest {
    client: GeminiClient,
    model: String,
}

impl GeminiDigest {
    pub fn new(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

pub fn review_prompt(date_label: &str) -> String {
    format!(
        "Tu es l'intelligence artificielle de l'application 'L'ENSEIGNANT EN SERVICE - Mr Cissé'. \
Tu rédiges la revue de presse quotidienne 'Le Cafard Libéré du Jour'.

Nous sommes le {date_label}. Analyse l'actualité sénégalaise des dernières 24 heures, \
uniquement à partir de : APS, Seneweb, SeneNews, Le Soleil, Senego et WiwSport.

Réponds UNIQUEMENT avec un objet JSON valide, sans texte autour et sans balises markdown. \
Clés attendues :
- \"date\": string (la date donnée)
- \"debateQuestion\": string
- \"summary\": string
- \"headlines\": tableau de {{ \"title\", \"category\", \"source\", \"content\": string, \"confidence\": number 0-100 }}
- \"opportunities\": tableau de {{ \"type\", \"title\", \"deadline\": string }}
- \"innovation\": {{ \"title\", \"description\": string }}
- \"debateDetails\": {{ \"pro\", \"con\", \"proExpert\", \"conExpert\": string }}
- \"motEnseignant\": string
- \"sources\": tableau de string
- \"caricatureCaption\": string (légende de la caricature)

Ton : éducatif, rigoureux, panafricain et inspirant. Français impeccable, avec Teranga et Jambar."
    )
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(body: &Value) -> Option<String> {
    let parts = body
        .pointer("/candidates/0/content/parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

/// Parse model output into a review. A single bad field fails the whole
/// review.
pub fn parse_review(text: &str) -> Result<StructuredReview> {
    let cleaned = strip_code_fence(text);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| Error::upstream(format!("digest is not JSON: {}", e)))?;
    if !value.is_object() {
        return Err(Error::upstream("digest is not a JSON object"));
    }
    serde_json::from_value(value)
        .map_err(|e| Error::upstream(format!("digest has unexpected shape: {}", e)))
}

#[async_trait]
impl DigestProvider for GeminiDigest {
    async fn fetch_daily_review(&self, date_label: &str) -> Result<StructuredReview> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": review_prompt(date_label) }]
            }]
        });

        log::info!("Requesting daily review for {} ({})", date_label, self.model);
        let resp = self
            .client
            .generate_content(&self.model, &body)
            .await
            .map_err(|e| Error::upstream(format!("{:#}", e)))?;

        let text = candidate_text(&resp)
            .ok_or_else(|| Error::upstream("digest response has no text"))?;
        log::debug!("Raw digest text: {}", text);

        let review = parse_review(&text)?;
        log::info!(
            "Daily review parsed: {} headlines, {} opportunities",
            review.headlines.len(),
            review.opportunities.len()
        );
        Ok(review)
    }
}

// ======================== Narration ========================

pub struct GeminiTts {
    client: GeminiClient,
    model: String,
    voice: String,
}

impl GeminiTts {
    pub fn new(client: GeminiClient, model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            voice: voice.into(),
        }
    }
}

fn inline_audio(body: &Value) -> Option<&str> {
    body.pointer("/candidates/0/content/parts/0/inlineData/data")?
        .as_str()
}

#[async_trait]
impl TtsProvider for GeminiTts {
    async fn generate_audio(&self, text: &str) -> Result<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            }
        });

        let resp = self
            .client
            .generate_content(&self.model, &body)
            .await
            .map_err(|e| Error::audio(format!("{:#}", e)))?;

        let data = inline_audio(&resp)
            .ok_or_else(|| Error::audio("speech response has no inline audio"))?;
        log::info!("Narration received: {} base64 chars", data.len());
        Ok(data.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::tests::SAMPLE_JSON;

    #[test]
    fn parses_fenced_review() {
        let text = format!("```json\n{}\n```", SAMPLE_JSON);
        let review = parse_review(&text).unwrap();
        assert_eq!(review.caricature_caption, "Le ministre et le baobab");
    }

    #[test]
    fn rejects_non_object_and_bad_shape() {
        assert!(matches!(
            parse_review("[1, 2, 3]"),
            Err(Error::UpstreamUnavailable(_))
        ));
        assert!(matches!(
            parse_review("Désolé, je ne peux pas."),
            Err(Error::UpstreamUnavailable(_))
        ));
        assert!(matches!(
            parse_review(r#"{"date": "x"}"#),
            Err(Error::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn extracts_candidate_text_and_audio() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\"" }, { "text": ":1}" }] } }]
        });
        assert_eq!(candidate_text(&body).as_deref(), Some("{\"a\":1}"));
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);

        let audio = json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "mimeType": "audio/L16;rate=24000", "data": "AAD/fw==" } }] } }]
        });
        assert_eq!(inline_audio(&audio), Some("AAD/fw=="));
    }

    #[test]
    fn prompt_names_date_and_sources() {
        let prompt = review_prompt("vendredi 16 octobre 2026");
        assert!(prompt.contains("Nous sommes le vendredi 16 octobre 2026."));
        assert!(prompt.contains("WiwSport"));
        assert!(prompt.contains("\"caricatureCaption\""));
    }

    #[tokio::test]
    async fn missing_key_is_upstream_error() {
        let client = GeminiClient::new(
            "https://generativelanguage.googleapis.com/v1beta",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let digest = GeminiDigest::new(client.clone(), "gemini-2.5-flash");
        assert!(matches!(
            digest.fetch_daily_review("lundi").await,
            Err(Error::UpstreamUnavailable(_))
        ));

        let tts = GeminiTts::new(client, "tts", "Kore");
        assert!(tts.generate_audio("bonjour").await.unwrap_err().is_audio());
    }
}
