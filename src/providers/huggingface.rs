//! Caricature generation through the Hugging Face inference API.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use uuid::Uuid;

use super::ImageProvider;
use crate::config::Config;

pub const MISSING_KEY_PLACEHOLDER: &str = "https://picsum.photos/800/600?text=Ajouter+HF_API_KEY";
pub const ERROR_PLACEHOLDER: &str = "https://picsum.photos/800/600?text=Erreur+HF";

const NEGATIVE_PROMPT: &str = "flou, réaliste, photo, moche, basse qualité, terne";

pub struct HuggingFaceImage {
    http: Client,
    model_url: String,
    api_key: Option<String>,
    steps: u32,
    guidance_scale: f32,
}

impl HuggingFaceImage {
    pub fn new(
        model_url: impl Into<String>,
        api_key: Option<String>,
        steps: u32,
        guidance_scale: f32,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            model_url: model_url.into(),
            api_key,
            steps,
            guidance_scale,
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(
            config.hf_model_url,
            config.huggingface_api_key.clone(),
            config.hf_steps,
            config.hf_guidance_scale,
            config.request_timeout(),
        )
    }

    async fn request_image(&self, key: &str, caption: &str) -> anyhow::Result<Bytes> {
        let body = json!({
            "inputs": caricature_prompt(caption),
            "parameters": {
                "num_inference_steps": self.steps,
                "guidance_scale": self.guidance_scale,
                "negative_prompt": NEGATIVE_PROMPT,
            }
        });

        let resp = self
            .http
            .post(&self.model_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .context("Request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP Error: {}", status);
        }
        let image = resp.bytes().await.context("Failed to read image body")?;
        if image.is_empty() {
            anyhow::bail!("empty image body");
        }
        Ok(image)
    }
}

/// The prompt ends with a random variant tag so two requests for the same
/// caption give different drawings.
pub fn caricature_prompt(caption: &str) -> String {
    let variant = Uuid::new_v4().simple().to_string();
    format!(
        "Crée une caricature satirique très exagérée et humoristique, style bande dessinée \
sénégalaise moderne, couleurs vives et contrastées, ambiance Teranga et Jambar, \
expressions comiques et ironiques, paysage mixte urbain-rural avec des éléments absurdes. \
Représente fidèlement cette légende : \"{caption}\". Touche d'ironie politique, symboles \
sénégalais, pas de réalisme. Haute qualité, style dessin animé satirique. Variante unique : {}",
        &variant[..6]
    )
}

pub fn png_data_url(image: &[u8]) -> String {
    format!("data:image/png;base64,{}", general_purpose::STANDARD.encode(image))
}

#[async_trait]
impl ImageProvider for HuggingFaceImage {
    async fn generate_caricature(&self, caption: &str) -> String {
        let Some(key) = self.api_key.as_deref() else {
            log::warn!("HUGGINGFACE_API_KEY not set, using placeholder");
            return MISSING_KEY_PLACEHOLDER.to_string();
        };

        log::info!("Generating caricature for: {}", caption);
        match self.request_image(key, caption).await {
            Ok(image) => {
                log::info!("Caricature generated ({} bytes)", image.len());
                png_data_url(&image)
            }
            Err(e) => {
                log::error!("Caricature generation failed: {:#}", e);
                ERROR_PLACEHOLDER.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: Option<&str>, url: &str) -> HuggingFaceImage {
        HuggingFaceImage::new(
            url,
            key.map(str::to_string),
            35,
            8.0,
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn missing_key_gives_placeholder() {
        let hf = provider(None, "http://127.0.0.1:9/unused");
        assert_eq!(hf.generate_caricature("légende").await, MISSING_KEY_PLACEHOLDER);
    }

    #[tokio::test]
    async fn request_failure_gives_placeholder() {
        // Nothing listens on the discard port
        let hf = provider(Some("hf_test"), "http://127.0.0.1:9/model");
        assert_eq!(hf.generate_caricature("légende").await, ERROR_PLACEHOLDER);
    }

    #[test]
    fn prompt_embeds_caption_and_varies() {
        let a = caricature_prompt("Le baobab");
        let b = caricature_prompt("Le baobab");
        assert!(a.contains("\"Le baobab\""));
        assert_ne!(a, b);
    }

    #[test]
    fn data_url_is_base64_png() {
        assert_eq!(png_data_url(&[0x89, 0x50]), "data:image/png;base64,iVA=");
    }
}
