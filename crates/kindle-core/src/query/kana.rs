//! Kana to Latin transliteration (modified Hepburn).

const SOKUON: char = 'っ';
const CHOONPU: char = 'ー';

/// Whether `c` is hiragana or katakana.
pub fn is_kana(c: char) -> bool {
    matches!(c, '\u{3041}'..='\u{3096}' | '\u{30A1}'..='\u{30FA}' | CHOONPU)
}

/// Map katakana to the matching hiragana, leaving everything else alone.
pub fn to_hiragana(c: char) -> char {
    match c {
        '\u{30A1}'..='\u{30F6}' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
        _ => c,
    }
}

/// Map hiragana to the matching katakana, leaving everything else alone.
pub fn to_katakana(c: char) -> char {
    match c {
        '\u{3041}'..='\u{3096}' => char::from_u32(c as u32 + 0x60).unwrap_or(c),
        _ => c,
    }
}

/// Romanize every kana in `input`; other characters pass through.
pub fn to_romaji(input: &str) -> String {
    let chars: Vec<char> = input.chars().map(to_hiragana).collect();
    let mut out = String::with_capacity(chars.len() * 2);
    let mut geminate = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == SOKUON {
            geminate = true;
            i += 1;
            continue;
        }

        if c == CHOONPU {
            // Long vowel mark repeats the previous vowel
            match out.chars().last() {
                Some(v @ ('a' | 'i' | 'u' | 'e' | 'o')) => out.push(v),
                _ => out.push('-'),
            }
            i += 1;
            continue;
        }

        let Some(base) = syllable(c) else {
            if geminate {
                out.push_str("tsu");
                geminate = false;
            }
            out.push(c);
            i += 1;
            continue;
        };

        let (romaji, consumed) = match chars.get(i + 1).copied().and_then(combine_small) {
            Some(small) => match combine(base, small) {
                Some(joined) => (joined, 2),
                None => (base.to_string(), 1),
            },
            None => (base.to_string(), 1),
        };

        if geminate {
            push_geminate(&mut out, &romaji);
            geminate = false;
        }
        out.push_str(&romaji);
        i += consumed;
    }

    if geminate {
        out.push_str("tsu");
    }
    out
}

/// Double the leading consonant for a preceding small tsu.
fn push_geminate(out: &mut String, romaji: &str) {
    match romaji.chars().next() {
        // Hepburn writes っち as tchi
        Some('c') => out.push('t'),
        Some(c) if !matches!(c, 'a' | 'i' | 'u' | 'e' | 'o' | 'n') => out.push(c),
        _ => out.push_str("tsu"),
    }
}

/// Small kana that merge with the preceding syllable.
fn combine_small(c: char) -> Option<char> {
    matches!(c, 'ゃ' | 'ゅ' | 'ょ' | 'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ').then_some(c)
}

fn combine(base: &str, small: char) -> Option<String> {
    let stem = base.strip_suffix('i');
    match small {
        'ゃ' | 'ゅ' | 'ょ' => {
            let stem = stem?;
            let vowel = match small {
                'ゃ' => 'a',
                'ゅ' => 'u',
                _ => 'o',
            };
            // sh, ch and j already carry the glide
            if matches!(stem, "sh" | "ch" | "j") {
                Some(format!("{stem}{vowel}"))
            } else {
                Some(format!("{stem}y{vowel}"))
            }
        }
        'ぁ' | 'ぃ' | 'ぅ' | 'ぇ' | 'ぉ' => {
            let vowel = small_vowel(small);
            match base {
                "fu" => Some(format!("f{vowel}")),
                "vu" => Some(format!("v{vowel}")),
                "te" if vowel == 'i' => Some("ti".to_string()),
                "de" if vowel == 'i' => Some("di".to_string()),
                "to" if vowel == 'u' => Some("tu".to_string()),
                "u" if vowel != 'u' => Some(format!("w{vowel}")),
                "shi" if vowel == 'e' => Some("she".to_string()),
                "chi" if vowel == 'e' => Some("che".to_string()),
                "ji" if vowel == 'e' => Some("je".to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

fn small_vowel(c: char) -> char {
    match c {
        'ぁ' => 'a',
        'ぃ' => 'i',
        'ぅ' => 'u',
        'ぇ' => 'e',
        _ => 'o',
    }
}

fn syllable(c: char) -> Option<&'static str> {
    let romaji = match c {
        'あ' | 'ぁ' => "a",
        'い' | 'ぃ' | 'ゐ' => "i",
        'う' | 'ぅ' => "u",
        'え' | 'ぇ' | 'ゑ' => "e",
        'お' | 'ぉ' | 'を' => "o",
        'か' | 'ゕ' => "ka",
        'き' => "ki",
        'く' => "ku",
        'け' | 'ゖ' => "ke",
        'こ' => "ko",
        'が' => "ga",
        'ぎ' => "gi",
        'ぐ' => "gu",
        'げ' => "ge",
        'ご' => "go",
        'さ' => "sa",
        'し' => "shi",
        'す' => "su",
        'せ' => "se",
        'そ' => "so",
        'ざ' => "za",
        'じ' | 'ぢ' => "ji",
        'ず' | 'づ' => "zu",
        'ぜ' => "ze",
        'ぞ' => "zo",
        'た' => "ta",
        'ち' => "chi",
        'つ' => "tsu",
        'て' => "te",
        'と' => "to",
        'だ' => "da",
        'で' => "de",
        'ど' => "do",
        'な' => "na",
        'に' => "ni",
        'ぬ' => "nu",
        'ね' => "ne",
        'の' => "no",
        'は' => "ha",
        'ひ' => "hi",
        'ふ' => "fu",
        'へ' => "he",
        'ほ' => "ho",
        'ば' => "ba",
        'び' => "bi",
        'ぶ' => "bu",
        'べ' => "be",
        'ぼ' => "bo",
        'ぱ' => "pa",
        'ぴ' => "pi",
        'ぷ' => "pu",
        'ぺ' => "pe",
        'ぽ' => "po",
        'ま' => "ma",
        'み' => "mi",
        'む' => "mu",
        'め' => "me",
        'も' => "mo",
        'や' | 'ゃ' => "ya",
        'ゆ' | 'ゅ' => "yu",
        'よ' | 'ょ' => "yo",
        'ら' => "ra",
        'り' => "ri",
        'る' => "ru",
        'れ' => "re",
        'ろ' => "ro",
        'わ' | 'ゎ' => "wa",
        'ん' => "n",
        'ゔ' => "vu",
        _ => return None,
    };
    Some(romaji)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_syllables() {
        assert_eq!(to_romaji("さふぁり"), "safari");
        assert_eq!(to_romaji("すらっく"), "surakku");
        assert_eq!(to_romaji("かれんだー"), "karendaa");
    }

    #[test]
    fn test_katakana_same_as_hiragana() {
        assert_eq!(to_romaji("サファリ"), to_romaji("さふぁり"));
        assert_eq!(to_romaji("ターミナル"), "taaminaru");
    }

    #[test]
    fn test_youon_digraphs() {
        assert_eq!(to_romaji("きょう"), "kyou");
        assert_eq!(to_romaji("しゃしん"), "shashin");
        assert_eq!(to_romaji("ちゅーる"), "chuuru");
        assert_eq!(to_romaji("じょぶ"), "jobu");
    }

    #[test]
    fn test_sokuon() {
        assert_eq!(to_romaji("まっち"), "matchi");
        assert_eq!(to_romaji("ざっし"), "zasshi");
        assert_eq!(to_romaji("あっ"), "atsu");
    }

    #[test]
    fn test_foreign_sound_combinations() {
        assert_eq!(to_romaji("ふぉと"), "foto");
        assert_eq!(to_romaji("でぃすく"), "disuku");
        assert_eq!(to_romaji("うぇぶ"), "webu");
        assert_eq!(to_romaji("ヴぃでお"), "video");
    }

    #[test]
    fn test_mixed_input_passes_through() {
        assert_eq!(to_romaji("vsこーど"), "vskoodo");
        assert_eq!(to_romaji("abc"), "abc");
    }

    #[test]
    fn test_script_conversion() {
        assert_eq!(to_katakana('た'), 'タ');
        assert_eq!(to_hiragana('タ'), 'た');
        assert_eq!(to_katakana('a'), 'a');
        assert!(is_kana('ー'));
        assert!(is_kana('ア'));
        assert!(!is_kana('漢'));
    }
}
