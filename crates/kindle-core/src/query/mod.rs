//! Query normalization.
//!
//! Raw input (possibly mid-composition) becomes an ordered list of canonical
//! query variants. The first variant is always the literal form; kana input
//! adds a katakana form and a romanized form. Each variant is searched
//! separately and the results merged in variant order.

mod kana;

pub use kana::to_romaji;

/// Fold full-width ASCII to half-width and the ideographic space to a space.
#[must_use]
pub fn fold_width(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3000}' => ' ',
        _ => c,
    }
}

/// Width-fold, lowercase and collapse whitespace.
///
/// Applied to queries and to candidate labels alike.
#[must_use]
pub fn canonicalize(text: &str) -> String {
    let folded: String = text.chars().map(fold_width).collect();
    folded
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical query variants for `raw`, most literal first.
///
/// Blank input yields no variants; callers treat that as an empty result set.
#[must_use]
pub fn normalize(raw: &str) -> Vec<String> {
    let literal = canonicalize(raw);
    if literal.is_empty() {
        return Vec::new();
    }

    let mut variants = vec![literal];
    if variants[0].chars().any(kana::is_kana) {
        let katakana: String = variants[0].chars().map(kana::to_katakana).collect();
        let romaji = kana::to_romaji(&variants[0]);
        for variant in [katakana, romaji] {
            if !variant.is_empty() && !variants.contains(&variant) {
                variants.push(variant);
            }
        }
    }
    variants
}
