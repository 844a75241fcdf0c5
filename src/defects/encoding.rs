//! Charset mis-decode
//!
//! Corruption reads the UTF-8 bytes of a string as Latin-1, turning `서울`
//! into `ì\u{84}\u{9c}ì\u{9a}¸`. Every byte maps to exactly one char in
//! `U+0000..=U+00FF`, so the damage is reversible.

/// UTF-8 bytes reinterpreted one-per-char as Latin-1
pub fn misdecode(text: &str) -> String {
    text.bytes().map(char::from).collect()
}

/// Undo `misdecode`. Returns `None` unless the recovered bytes are valid UTF-8.
pub fn reverse_misdecode(text: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        let code = u32::from(c);
        if code > 0xFF {
            return None;
        }
        bytes.push(code as u8);
    }
    String::from_utf8(bytes).ok()
}

/// Replacement characters, or Latin-1 text that decodes cleanly as UTF-8
pub fn looks_corrupted(text: &str) -> bool {
    if text.contains(char::REPLACEMENT_CHARACTER) {
        return true;
    }
    !text.is_ascii() && reverse_misdecode(text).is_some_and(|fixed| fixed != text)
}
