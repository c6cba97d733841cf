//! Microsoft Azure Text-to-Speech provider.
//!
//! - **config**: SSML generation and Azure header constants
//! - **provider**: `AzureRequestBuilder` for the REST synthesis endpoint
//!
//! Documentation: <https://learn.microsoft.com/en-us/azure/ai-services/speech-service/rest-text-to-speech>

mod config;
mod provider;

pub use config::{
    AZURE_MP3_FORMAT, AZURE_OUTPUT_FORMAT_HEADER, AZURE_SUBSCRIPTION_KEY_HEADER, build_ssml,
    escape_xml, language_code, region_base_url,
};
pub use provider::{AzureRequestBuilder, DEFAULT_AZURE_REGION};
