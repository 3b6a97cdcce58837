//! Audio locator handling.
//!
//! An [`AudioReference`] wraps the URL or path of a previously recorded clip
//! and derives the container format the endpoint expects from the trailing
//! filename extension.

use std::fmt;

/// A locator (URL or filesystem path) for a recorded audio clip.
///
/// ```rust
/// use ielts_speaking_eval::llm::AudioReference;
///
/// let audio = AudioReference::new("https://example.org/clips/part_1.mp3");
/// assert_eq!(audio.format(), Some("mp3"));
///
/// let bare = AudioReference::new("https://example.org/clips/part_1");
/// assert_eq!(bare.format(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioReference {
    locator: String,
    format: Option<String>,
}

impl AudioReference {
    pub fn new(locator: impl Into<String>) -> Self {
        let locator = locator.into();
        let format = extension_of(&locator).map(str::to_string);
        Self { locator, format }
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Format tag derived from the extension, case preserved.
    ///
    /// `None` when the locator does not end in `.<alphanumeric>+`.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }
}

impl fmt::Display for AudioReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.locator)
    }
}

/// The run of ASCII alphanumerics after the final `.`, provided it reaches
/// the end of the string.
fn extension_of(locator: &str) -> Option<&str> {
    let (_, ext) = locator.rsplit_once('.')?;
    if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(ext)
    } else {
        None
    }
}
