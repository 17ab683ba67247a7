//! Recognition adapter contract.
//!
//! A [`Recognizer`] turns a [`RecognitionRequest`] into a [`RecognitionResult`]
//! carrying the same [`CorrelationToken`]. Calls are blocking and may be made
//! from many worker threads at once.

pub mod tesseract;

pub use tesseract::TesseractRecognizer;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RecognitionError;
use crate::raster::Image;

/// A recognition language identifier, e.g. `eng`, `ara`, `chi_sim`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Validate a code: non-empty ASCII alphanumerics, `_` or `-`.
    pub fn new(code: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if valid {
            Ok(Self(code))
        } else {
            Err(format!("invalid language code '{code}'"))
        }
    }

    /// Built-in codes known to be well formed.
    pub(crate) fn from_static(code: &'static str) -> Self {
        debug_assert!(Self::new(code).is_ok());
        Self(code.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join languages in priority order using the `+` multi-language syntax.
pub fn join_languages(languages: &[LanguageCode]) -> String {
    languages
        .iter()
        .map(LanguageCode::as_str)
        .collect::<Vec<_>>()
        .join("+")
}

/// Opaque tag tying a result back to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationToken(u64);

impl CorrelationToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Token for a zero-based page index.
    pub fn for_page(index: usize) -> Self {
        Self(index as u64)
    }

    /// The page index this token was created from.
    pub fn page_index(self) -> usize {
        self.0 as usize
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// One image to recognize.
#[derive(Debug)]
pub struct RecognitionRequest {
    pub image: Image,
    /// Non-empty; order is the engine's priority order
    pub languages: Vec<LanguageCode>,
    pub token: CorrelationToken,
}

impl RecognitionRequest {
    pub fn new(image: Image, languages: Vec<LanguageCode>, token: CorrelationToken) -> Self {
        Self {
            image,
            languages,
            token,
        }
    }
}

/// Text recognized for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub text: String,
    pub token: CorrelationToken,
}

/// A blocking recognition engine safe to share across worker threads.
pub trait Recognizer: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Whether the engine's runtime prerequisites are present.
    fn check_available(&self) -> bool;

    /// Recognize one image. The result must carry `request.token` unchanged.
    fn recognize(&self, request: RecognitionRequest)
        -> Result<RecognitionResult, RecognitionError>;
}
