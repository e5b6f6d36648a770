//! Text sanitizing for model output and HTML pages

/// Remove ANSI CSI escape sequences (`ESC [ params intermediates final`).
///
/// An escape that never reaches a final byte is left untouched.
pub fn strip_ansi_codes(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied_until = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == 0x1B && bytes.get(i + 1) == Some(&b'[') {
            let mut j = i + 2;
            while j < bytes.len() && (0x30..=0x3F).contains(&bytes[j]) {
                j += 1;
            }
            while j < bytes.len() && (0x20..=0x2F).contains(&bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && (0x40..=0x7E).contains(&bytes[j]) {
                out.push_str(&text[copied_until..i]);
                i = j + 1;
                copied_until = i;
                continue;
            }
        }
        i += 1;
    }

    out.push_str(&text[copied_until..]);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
