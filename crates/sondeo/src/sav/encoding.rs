//! Character decoding for names, labels and string values.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Text encoding of a system file.
///
/// UTF-8 decoding falls back to Windows-1252 for invalid sequences, since
/// older files often declare nothing and store Latin-1 text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    /// UTF-8.
    #[must_use]
    pub fn utf8() -> Self {
        Self(UTF_8)
    }

    /// Windows-1252 (a superset of Latin-1 for printable characters).
    #[must_use]
    pub fn windows_1252() -> Self {
        Self(WINDOWS_1252)
    }

    /// Resolve an encoding name from the character encoding record.
    ///
    /// Names follow the WHATWG labels, so `ISO-8859-1` and `cp1252` both
    /// resolve to Windows-1252.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Encoding::for_label(name.trim().as_bytes()).map(Self)
    }

    /// Resolve a Windows code page from the integer info record.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        let label = match code {
            65001 => "utf-8".to_string(),
            20127 | 28591 => "windows-1252".to_string(),
            874 | 1250..=1258 => format!("windows-{code}"),
            866 => "ibm866".to_string(),
            932 => "shift_jis".to_string(),
            936 => "gbk".to_string(),
            949 => "euc-kr".to_string(),
            950 => "big5".to_string(),
            20866 => "koi8-r".to_string(),
            21866 => "koi8-u".to_string(),
            20932 | 51932 => "euc-jp".to_string(),
            54936 => "gb18030".to_string(),
            28592..=28606 => format!("iso-8859-{}", code - 28590),
            _ => return None,
        };
        Self::from_name(&label)
    }

    /// Canonical name of the encoding.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Decode bytes to a string.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        if self.0 != UTF_8 {
            return self.0.decode_without_bom_handling(bytes).0.into_owned();
        }
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            // A fixed-width field may cut a multi-byte character in half.
            Err(err) if err.error_len().is_none() => {
                String::from_utf8_lossy(&bytes[..err.valid_up_to()]).into_owned()
            }
            Err(_) => WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }
}

/// Decode a fixed-width field, dropping trailing spaces and NULs.
#[must_use]
pub fn decode_trimmed(encoding: TextEncoding, bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |p| p + 1);
    encoding.decode(&bytes[..end])
}

/// Truncate a string to at most `max` bytes without splitting a character.
#[must_use]
pub fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
