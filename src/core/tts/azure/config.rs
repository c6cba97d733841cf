//! SSML generation for the Azure Speech REST endpoint.

use crate::core::tts::base::AudioSettings;

/// Header carrying the requested output encoding
pub const AZURE_OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";

/// Header carrying the subscription key
pub const AZURE_SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Fixed mp3 output requested from Azure
pub const AZURE_MP3_FORMAT: &str = "audio-24khz-96kbitrate-mono-mp3";

/// Bitrate of [`AZURE_MP3_FORMAT`] in kbps
pub const AZURE_MP3_BITRATE_KBPS: u32 = 96;

/// Build the regional endpoint root, e.g. `https://westeurope.tts.speech.microsoft.com`
pub fn region_base_url(region: &str) -> String {
    format!("https://{}.tts.speech.microsoft.com", region.trim().to_lowercase())
}

/// Escapes XML special characters in text for safe SSML embedding.
///
/// ```rust
/// use voxrelay::core::tts::azure::escape_xml;
///
/// assert_eq!(escape_xml("Tom & Jerry"), "Tom &amp; Jerry");
/// assert_eq!(escape_xml("<b>'hi'</b>"), "&lt;b&gt;&apos;hi&apos;&lt;/b&gt;");
/// ```
pub fn escape_xml(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Extract the `xx-YY` locale prefix from an Azure voice name.
///
/// Falls back to `en-US` for names that do not follow the
/// `{lang}-{REGION}-{Name}Neural` pattern.
pub fn language_code(voice_name: &str) -> String {
    let mut parts = voice_name.split('-');
    if let (Some(lang), Some(region)) = (parts.next(), parts.next())
        && !lang.is_empty()
        && region.len() == 2
        && region.chars().all(|c| c.is_ascii_uppercase())
    {
        return format!("{lang}-{region}");
    }
    "en-US".to_string()
}

/// Build the SSML document for one synthesis request.
///
/// Rate and volume always go through a prosody element so the request
/// reflects the caller's settings exactly.
pub fn build_ssml(text: &str, voice_name: &str, settings: &AudioSettings) -> String {
    let rate_percent = (settings.playback_speed * 100.0).round() as i32;
    format!(
        r#"<speak version='1.0' xmlns='http://www.w3.org/2001/10/synthesis' xml:lang='{language}'>
    <voice name='{voice}'>
        <prosody rate="{rate_percent}%" volume="{volume}">{body}</prosody>
    </voice>
</speak>"#,
        language = language_code(voice_name),
        voice = escape_xml(voice_name),
        volume = settings.volume,
        body = escape_xml(text),
    )
}
