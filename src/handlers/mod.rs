//! HTTP request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Health check endpoint
//! - `tts` - Conversion, status and provider endpoints
//! - `audio` - Playback, download, info and deletion of stored audio

pub mod api;
pub mod audio;
pub mod tts;
