//! Display-width aware text fitting.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// `s` cut to at most `width` terminal columns, with `…` when cut.
pub fn fit(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_by_columns_not_bytes() {
        assert_eq!(fit("Heat", 10), "Heat");
        assert_eq!(fit("Night Drive", 6), "Night…");
        // CJK glyphs are two columns wide.
        assert_eq!(fit("東京の夜", 5), "東京…");
        assert_eq!(fit("abc", 0), "");
    }
}
