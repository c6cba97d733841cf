//! # Deepgram TTS Implementation
//!
//! Deepgram Aura synthesis over the REST `speak` endpoint. Deepgram exposes
//! voices as models, so the translated voice is passed as the `model` query
//! parameter.

use serde::Deserialize;
use serde_json::json;

use super::base::AudioSettings;
use super::provider::SynthesisRequestBuilder;

pub const DEEPGRAM_API_URL: &str = "https://api.deepgram.com";

/// Bitrate requested for mp3 output (bits per second)
const MP3_BIT_RATE: u32 = 48_000;

const VOICE_TABLE: &[(&str, &str)] = &[
    ("default", "aura-asteria-en"),
    ("female", "aura-luna-en"),
    ("male", "aura-orion-en"),
    ("narrator", "aura-arcas-en"),
];

#[derive(Debug, Deserialize)]
struct DeepgramModelsResponse {
    tts: Option<Vec<DeepgramTtsModel>>,
}

#[derive(Debug, Deserialize)]
struct DeepgramTtsModel {
    canonical_name: String,
}

/// Deepgram-specific request builder
#[derive(Debug, Clone)]
pub struct DeepgramRequestBuilder {
    api_key: String,
    base_url: String,
}

impl DeepgramRequestBuilder {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| DEEPGRAM_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.api_key)
    }
}

impl SynthesisRequestBuilder for DeepgramRequestBuilder {
    fn provider_name(&self) -> &str {
        "deepgram"
    }

    fn build_synthesis_request(
        &self,
        client: &reqwest::Client,
        text: &str,
        voice: &str,
        _settings: &AudioSettings,
    ) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/v1/speak?model={voice}&encoding=mp3&bit_rate={MP3_BIT_RATE}",
            self.base_url
        );

        client
            .post(url)
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json")
            .json(&json!({ "text": text }))
    }

    fn build_voices_request(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/v1/models", self.base_url))
            .header("Authorization", self.auth_header())
    }

    fn parse_voices(&self, body: &serde_json::Value) -> Vec<String> {
        serde_json::from_value::<DeepgramModelsResponse>(body.clone())
            .ok()
            .and_then(|r| r.tts)
            .map(|models| models.into_iter().map(|m| m.canonical_name).collect())
            .unwrap_or_default()
    }

    fn voice_table(&self) -> &'static [(&'static str, &'static str)] {
        VOICE_TABLE
    }

    fn bitrate_kbps(&self) -> Option<u32> {
        Some(MP3_BIT_RATE / 1000)
    }
}
