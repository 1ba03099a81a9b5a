//! Verse model and the lookup service client

pub mod client;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::VerseClient;

/// Message shown to the user for every kind of fetch failure
pub const FETCH_ERROR_MESSAGE: &str = "Failed to load Bible verse. Please try again.";

/// One randomly selected passage as returned by the lookup service.
///
/// Fields the service leaves out deserialize as empty strings and are
/// rendered blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verse {
    pub text: String,
    pub reference: String,
    pub translation_name: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("verse service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("request to verse service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected verse payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Verse {
    /// Text as shown on screen. The service usually ends it with a newline.
    pub fn display_text(&self) -> &str {
        self.text.trim_end()
    }
}

impl FetchError {
    /// All failures collapse to the same user-facing text
    pub fn user_message(&self) -> &'static str {
        FETCH_ERROR_MESSAGE
    }
}
