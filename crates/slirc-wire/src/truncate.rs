//! Byte-exact outbound truncation.
//!
//! An IRC line may not exceed 512 bytes including its CR-LF terminator, and a
//! line the server relays to other clients is prefixed with our hostmask, so
//! the usable budget depends on who will end up reading the line:
//!
//! - [`SERVER_BUDGET`]: what the server itself accepts (510 bytes).
//! - [`client_budget`]: what survives being relayed as
//!   `:nick!user@host <line>` (and, with `identify-msg`, one more byte for the
//!   `+`/`-` marker).
//!
//! Truncation always cuts on a character boundary, so the result is valid
//! UTF-8 that never exceeds the limit.

use std::borrow::Cow;

use crate::error::TruncateError;

/// Protocol ceiling for one line, terminator included.
pub const WIRE_CEILING: usize = 512;

/// Line terminator appended to every outbound line.
pub const CRLF: &str = "\r\n";

/// Byte budget for a line the server accepts.
pub const SERVER_BUDGET: usize = WIRE_CEILING - CRLF.len();

/// Byte budget for a line the server will relay to other clients.
///
/// The relay prefix is `:` + hostmask + ` `, hence the extra two bytes.
///
/// ```
/// use slirc_wire::client_budget;
///
/// assert_eq!(client_budget("bot!user@host".len(), false), 495);
/// assert_eq!(client_budget("bot!user@host".len(), true), 494);
/// ```
pub fn client_budget(hostmask_len: usize, identify_msg: bool) -> usize {
    let marker = usize::from(identify_msg);
    SERVER_BUDGET.saturating_sub(hostmask_len + 2 + marker)
}

/// Text that went through [`truncate`], with the limit it was cut to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Truncated {
    text: String,
    limit: usize,
}

/// One outbound line on its way to the socket.
///
/// Built by the sender, cut down by [`truncate`], consumed by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    original: String,
    truncated: Option<Truncated>,
    dont_truncate: bool,
    log_hide: Option<String>,
}

impl OutboundRequest {
    /// Create a request for `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            original: text.into(),
            truncated: None,
            dont_truncate: false,
            log_hide: None,
        }
    }

    /// Fail instead of dropping characters.
    #[must_use]
    pub fn dont_truncate(mut self) -> Self {
        self.dont_truncate = true;
        self
    }

    /// Log `replacement` instead of the line itself (passwords and such).
    #[must_use]
    pub fn log_hide(mut self, replacement: impl Into<String>) -> Self {
        self.log_hide = Some(replacement.into());
        self
    }

    /// The text as the caller gave it.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The truncated text, if [`truncate`] has run.
    pub fn text(&self) -> Option<&str> {
        self.truncated.as_ref().map(|t| t.text.as_str())
    }

    /// Byte limit the text was last cut to.
    pub fn limit(&self) -> Option<usize> {
        self.truncated.as_ref().map(|t| t.limit)
    }

    /// Whether [`truncate`] has run.
    pub fn is_truncated(&self) -> bool {
        self.truncated.is_some()
    }

    /// Whether losing characters is an error.
    pub fn is_strict(&self) -> bool {
        self.dont_truncate
    }

    /// Text safe to put in logs.
    pub fn log_text(&self) -> &str {
        self.log_hide
            .as_deref()
            .or_else(|| self.text())
            .unwrap_or(&self.original)
    }

    /// Whether the request carries a log redaction.
    pub fn is_hidden(&self) -> bool {
        self.log_hide.is_some()
    }
}

impl From<&str> for OutboundRequest {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for OutboundRequest {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Replace every CR and LF with a space.
///
/// One character in, one character out, so character counts taken before and
/// after stay comparable.
pub fn flatten_line_breaks(text: &str) -> Cow<'_, str> {
    if text.contains(['\r', '\n']) {
        Cow::Owned(text.replace(['\r', '\n'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Largest char boundary in `text` that is `<= limit`.
pub fn floor_char_boundary(text: &str, limit: usize) -> usize {
    if limit >= text.len() {
        return text.len();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}

fn is_strippable(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\x0C' | '\r' | '\0')
}

/// Cut `request` down to at most `byte_limit` bytes.
///
/// Line breaks become spaces, surrounding whitespace is stripped, then the
/// text is shortened to the last character boundary that fits. A request that
/// was already truncated to `byte_limit` or less is returned as is.
///
/// # Errors
///
/// [`TruncateError::WouldTruncate`] when the request is marked
/// [`OutboundRequest::dont_truncate`] and at least one character would be
/// dropped.
pub fn truncate(
    mut request: OutboundRequest,
    byte_limit: usize,
) -> Result<OutboundRequest, TruncateError> {
    let normalized = match &request.truncated {
        Some(done) if done.limit <= byte_limit => return Ok(request),
        Some(done) => done.text.clone(),
        None => flatten_line_breaks(&request.original)
            .trim_matches(is_strippable)
            .to_owned(),
    };

    let end = floor_char_boundary(&normalized, byte_limit);
    if request.dont_truncate && end < normalized.len() {
        return Err(TruncateError::WouldTruncate {
            original_chars: normalized.chars().count(),
            kept_chars: normalized[..end].chars().count(),
        });
    }

    let mut text = normalized;
    text.truncate(end);
    request.truncated = Some(Truncated {
        text,
        limit: byte_limit,
    });
    Ok(request)
}
