//! Brightness-to-text palette

/// Default glyphs, lightest first
pub const DEFAULT_GLYPHS: [&str; 5] = [" ", "░", "▒", "▓", "█"];

/// Query parameter names, one per palette slot
const SLOT_PARAMS: [&str; 5] = ["c0", "c1", "c2", "c3", "c4"];

/// Five text tokens, index 0 lightest, index 4 darkest
///
/// 1-bit images only use slots 0 and 1. Tokens are arbitrary strings and are
/// emitted verbatim, so a slot may hold several characters or a multi-byte
/// glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    tokens: [String; 5],
}

impl Palette {
    pub fn new(tokens: [&str; 5]) -> Self {
        Self {
            tokens: tokens.map(str::to_string),
        }
    }

    /// Build a palette from the raw (still percent-encoded) query string
    ///
    /// Reads `c0`..`c4`. A slot that is absent, empty, or does not decode to
    /// UTF-8 keeps its default glyph. The first occurrence of a key wins.
    pub fn from_query(raw_query: Option<&str>) -> Self {
        let mut slots: [Option<String>; 5] = Default::default();

        for pair in raw_query.unwrap_or_default().split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let Some(index) = SLOT_PARAMS.iter().position(|p| *p == key) else {
                continue;
            };
            if slots[index].is_some() {
                continue;
            }
            slots[index] = Some(value.to_string());
        }

        let mut palette = Self::default();
        for (index, value) in slots.into_iter().enumerate() {
            if let Some(token) = value.as_deref().and_then(decode_token) {
                palette.tokens[index] = token;
            }
        }
        palette
    }

    /// Replace a single slot
    pub fn with_token(mut self, index: usize, token: impl Into<String>) -> Self {
        if let Some(slot) = self.tokens.get_mut(index) {
            *slot = token.into();
        }
        self
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn tokens(&self) -> &[String; 5] {
        &self.tokens
    }

    /// Token for a 1-bit pixel
    pub fn for_bit(&self, bit: u8) -> &str {
        if bit == 0 {
            &self.tokens[0]
        } else {
            &self.tokens[1]
        }
    }

    /// Token for a 0-255 luminance value, lightest bracket first
    pub fn for_luminance(&self, luma: u8) -> &str {
        let index = match luma {
            204..=255 => 0,
            153..=203 => 1,
            102..=152 => 2,
            51..=101 => 3,
            _ => 4,
        };
        &self.tokens[index]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_GLYPHS)
    }
}

/// Percent-decode a query value (`+` is a space). `None` for empty values,
/// malformed escapes, or bytes that are not UTF-8.
fn decode_token(raw: &str) -> Option<String> {
    if raw.is_empty() || !escapes_well_formed(raw) {
        return None;
    }
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|token| token.into_owned())
}

/// Every `%` is followed by two hex digits
fn escapes_well_formed(raw: &str) -> bool {
    raw.split('%')
        .skip(1)
        .all(|rest| rest.len() >= 2 && rest.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit))
}
