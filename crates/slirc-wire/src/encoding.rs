//! Inbound text decoding.
//!
//! Servers relay whatever bytes their clients send, so a line is not
//! guaranteed to be UTF-8. Lines that are valid UTF-8 pass through untouched;
//! anything else is re-decoded from a legacy 8-bit code page. Undefined or
//! malformed sequences become U+FFFD. Decoding never fails.

use std::borrow::Cow;

use encoding::Encoding;

/// Default fallback code page label.
pub const DEFAULT_FALLBACK: &str = "windows-1252";

/// Turns raw inbound bytes into text.
///
/// The fallback encoding is fixed at construction, so two links can use
/// different code pages without any shared state.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    fallback: &'static Encoding,
}

impl Normalizer {
    /// Create a normalizer with an explicit fallback encoding.
    pub fn new(fallback: &'static Encoding) -> Self {
        Self { fallback }
    }

    /// Create a normalizer from an encoding label (e.g. `"latin1"`).
    ///
    /// Returns `None` for labels the WHATWG encoding standard doesn't know.
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self::new)
    }

    /// The fallback encoding's canonical name.
    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }

    /// Decode `bytes`, assuming UTF-8 first.
    pub fn normalize<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text),
            Err(_) => {
                let (text, _had_errors) = self.fallback.decode_without_bom_handling(bytes);
                text
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(encoding::WINDOWS_1252)
    }
}
