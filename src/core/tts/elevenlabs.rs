use serde::{Deserialize, Serialize};
use serde_json::json;

use super::base::AudioSettings;
use super::provider::SynthesisRequestBuilder;

pub const ELEVENLABS_API_URL: &str = "https://api.elevenlabs.io";

/// Speed range accepted by the ElevenLabs voice settings
const MIN_SPEED: f32 = 0.7;
const MAX_SPEED: f32 = 1.2;

/// Default model used for synthesis
const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

/// Generic voice names mapped to ElevenLabs premade voice ids
const VOICE_TABLE: &[(&str, &str)] = &[
    ("default", "21m00Tcm4TlvDq8ikWAM"),
    ("female", "EXAVITQu4vr4xnSDxMaL"),
    ("male", "pNInz6obpgDQGcFmaJgB"),
    ("narrator", "onwK4e9ZLuTAKqWW03F9"),
];

/// Voice settings for ElevenLabs TTS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Voice stability (0.0 to 1.0)
    pub stability: f32,
    /// Similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,
    /// Speaking rate (0.7 to 1.2)
    pub speed: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.8,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ElevenLabsVoicesResponse {
    voices: Vec<ElevenLabsVoice>,
}

#[derive(Debug, Deserialize)]
struct ElevenLabsVoice {
    voice_id: String,
}

/// ElevenLabs-specific request builder
#[derive(Debug, Clone)]
pub struct ElevenLabsRequestBuilder {
    api_key: String,
    base_url: String,
    model: String,
}

impl ElevenLabsRequestBuilder {
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url
                .unwrap_or_else(|| ELEVENLABS_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    fn voice_settings(settings: &AudioSettings) -> VoiceSettings {
        VoiceSettings {
            speed: settings.playback_speed.clamp(MIN_SPEED, MAX_SPEED),
            ..Default::default()
        }
    }
}

impl SynthesisRequestBuilder for ElevenLabsRequestBuilder {
    fn provider_name(&self) -> &str {
        "elevenlabs"
    }

    fn build_synthesis_request(
        &self,
        client: &reqwest::Client,
        text: &str,
        voice: &str,
        settings: &AudioSettings,
    ) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/v1/text-to-speech/{voice}?output_format=mp3_44100_128",
            self.base_url
        );

        let body = json!({
            "text": text,
            "model_id": self.model,
            "voice_settings": Self::voice_settings(settings),
        });

        client
            .post(url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .header("Accept", "audio/mpeg")
            .json(&body)
    }

    fn build_voices_request(&self, client: &reqwest::Client) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/v1/voices", self.base_url))
            .header("xi-api-key", &self.api_key)
    }

    fn parse_voices(&self, body: &serde_json::Value) -> Vec<String> {
        serde_json::from_value::<ElevenLabsVoicesResponse>(body.clone())
            .map(|r| r.voices.into_iter().map(|v| v.voice_id).collect())
            .unwrap_or_default()
    }

    fn voice_table(&self) -> &'static [(&'static str, &'static str)] {
        VOICE_TABLE
    }

    fn bitrate_kbps(&self) -> Option<u32> {
        Some(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ElevenLabsRequestBuilder {
        ElevenLabsRequestBuilder::new("test-key", Some("http://localhost:9999/".to_string()))
    }

    #[test]
    fn test_build_request_url_and_headers() {
        let client = reqwest::Client::new();
        let request = builder()
            .build_synthesis_request(&client, "Hello", "voice-1", &AudioSettings::default())
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.url().as_str(),
            "http://localhost:9999/v1/text-to-speech/voice-1?output_format=mp3_44100_128"
        );
        assert_eq!(request.headers().get("xi-api-key").unwrap(), "test-key");
        assert_eq!(request.headers().get("accept").unwrap(), "audio/mpeg");
    }

    #[test]
    fn test_speed_is_clamped_to_backend_range() {
        let settings = AudioSettings {
            playback_speed: 1.5,
            ..Default::default()
        };
        assert_eq!(ElevenLabsRequestBuilder::voice_settings(&settings).speed, MAX_SPEED);

        let settings = AudioSettings {
            playback_speed: 0.8,
            ..Default::default()
        };
        assert_eq!(ElevenLabsRequestBuilder::voice_settings(&settings).speed, 0.8);
    }

    #[test]
    fn test_voice_translation() {
        let b = builder();
        assert_eq!(b.resolve_voice(None), "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(b.resolve_voice(Some("male")), "pNInz6obpgDQGcFmaJgB");
        assert_eq!(b.resolve_voice(Some("my-clone")), "my-clone");
    }

    #[test]
    fn test_parse_voices() {
        let body = json!({"voices": [{"voice_id": "a", "name": "A"}, {"voice_id": "b"}]});
        assert_eq!(builder().parse_voices(&body), vec!["a", "b"]);
        assert!(builder().parse_voices(&json!({"unexpected": true})).is_empty());
    }
}
