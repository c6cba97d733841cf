//! Azure request builder.
//!
//! - Synthesis: `POST {base}/cognitiveservices/v1` with an SSML body
//! - Voices: `GET {base}/cognitiveservices/voices/list`
//! - Auth: `Ocp-Apim-Subscription-Key` header

use serde::Deserialize;

use super::config::{
    AZURE_MP3_BITRATE_KBPS, AZURE_MP3_FORMAT, AZURE_OUTPUT_FORMAT_HEADER,
    AZURE_SUBSCRIPTION_KEY_HEADER, build_ssml, region_base_url,
};
use crate::core::tts::base::AudioSettings;
use crate::core::tts::provider::SynthesisRequestBuilder;

pub const DEFAULT_AZURE_REGION: &str = "eastus";

const VOICE_TABLE: &[(&str, &str)] = &[
    ("default", "en-US-JennyNeural"),
    ("female", "en-US-AriaNeural"),
    ("male", "en-US-GuyNeural"),
    ("narrator", "en-US-DavisNeural"),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AzureVoice {
    short_name: String,
}

/// Azure-specific request builder
#[derive(Debug, Clone)]
pub struct AzureRequestBuilder {
    subscription_key: String,
    base_url: String,
}

impl AzureRequestBuilder {
    /// Create a builder for `region`, or for an explicit `base_url` override
    pub fn new(
        subscription_key: impl Into<String>,
        region: Option<&str>,
        base_url: Option<String>,
    ) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| region_base_url(region.unwrap_or(DEFAULT_AZURE_REGION)))
            .trim_end_matches('/')
            .to_string();

        Self {
            subscription_key: subscription_key.into(),
            base_url,
        }
    }
}

impl SynthesisRequestBuilder for AzureRequestBuilder {
    fn provider_name(&self) -> &str {
        "azure"
    }

    fn build_synthesis_request(
        &self,
        client: &reqwest::Client,
        text: &str,
        voice: &str,
        settings: &AudioSettings,
    ) -> reqwest::RequestBuilder {
        client
            .post(format!("{}/cognitiveservices/v1", self.base_url))
            .header(AZURE_SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .header("Content-Type", "application/ssml+xml")
            .header(AZURE_OUTPUT_FORMAT_HEADER, AZURE_MP3_FORMAT)
            .body(build_ssml(text, voice, settings))
    }

    fn build_voices_request(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/cognitiveservices/voices/list", self.base_url))
            .header(AZURE_SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
    }

    fn parse_voices(&self, body: &serde_json::Value) -> Vec<String> {
        serde_json::from_value::<Vec<AzureVoice>>(body.clone())
            .map(|voices| voices.into_iter().map(|v| v.short_name).collect())
            .unwrap_or_default()
    }

    fn voice_table(&self) -> &'static [(&'static str, &'static str)] {
        VOICE_TABLE
    }

    fn bitrate_kbps(&self) -> Option<u32> {
        Some(AZURE_MP3_BITRATE_KBPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_region_url() {
        let client = reqwest::Client::new();
        let builder = AzureRequestBuilder::new("key", Some("westeurope"), None);
        let request = builder
            .build_synthesis_request(&client, "Hi", "en-US-JennyNeural", &AudioSettings::default())
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
        assert_eq!(
            request.headers().get(AZURE_OUTPUT_FORMAT_HEADER).unwrap(),
            AZURE_MP3_FORMAT
        );
        assert_eq!(
            request.headers().get("content-type").unwrap(),
            "application/ssml+xml"
        );
    }

    #[test]
    fn test_base_url_override_wins_over_region() {
        let builder = AzureRequestBuilder::new("key", Some("westeurope"), Some("http://mock/".into()));
        let client = reqwest::Client::new();
        let request = builder.build_voices_request(&client).build().unwrap();
        assert_eq!(request.url().as_str(), "http://mock/cognitiveservices/voices/list");
    }

    #[test]
    fn test_parse_voices() {
        let builder = AzureRequestBuilder::new("key", None, None);
        let body = json!([
            {"ShortName": "en-US-JennyNeural", "Locale": "en-US"},
            {"ShortName": "de-DE-KatjaNeural", "Locale": "de-DE"}
        ]);
        assert_eq!(
            builder.parse_voices(&body),
            vec!["en-US-JennyNeural", "de-DE-KatjaNeural"]
        );
    }
}
