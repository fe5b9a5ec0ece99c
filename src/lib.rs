//! Web backend that relays spoken or typed text to Vertex AI Gemini and
//! returns a corrected English and Japanese rendition.

pub mod config;
pub mod error;
pub mod prompt;
pub mod server;
pub mod state;
pub mod vertex;
