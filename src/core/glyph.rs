//! Glyph Codec
//!
//! Bijective mapping between Latin letters and enchanting-table glyphs
//! (the Standard Galactic Alphabet). A word's encoded form is what players
//! see on the option buttons.

/// Letter to glyph table. Some glyphs span two characters.
const GLYPHS: [(char, &str); 26] = [
    ('A', "ᔑ"),
    ('B', "ʖ"),
    ('C', "ᓵ"),
    ('D', "↸"),
    ('E', "ᒷ"),
    ('F', "⎓"),
    ('G', "⊣"),
    ('H', "⍑"),
    ('I', "╎"),
    ('J', "⋮"),
    ('K', "ꖌ"),
    ('L', "ꖎ"),
    ('M', "ᒲ"),
    ('N', "リ"),
    ('O', "𝙹"),
    ('P', "!¡"),
    ('Q', "ᑑ"),
    ('R', "∷"),
    ('S', "ᓭ"),
    ('T', "ℸ"),
    ('U', "⚍"),
    ('V', "⍊"),
    ('W', "∴"),
    ('X', "\u{307}/"),
    ('Y', "||"),
    ('Z', "⨅"),
];

/// Combining dot below. Some renderings attach it to the T glyph; it
/// carries no letter of its own.
const DOT_BELOW: char = '\u{323}';

/// Direction of a translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Latin text to glyphs.
    Encode,
    /// Glyphs to Latin text.
    Decode,
}

/// Encode text into glyphs.
///
/// Letters are uppercased and mapped; anything else passes through.
/// Output units are joined with single spaces.
pub fn encode(text: &str) -> String {
    text.chars()
        .flat_map(char::to_uppercase)
        .map(|c| glyph_for(c).map_or_else(|| c.to_string(), str::to_string))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode glyphs back into Latin letters.
///
/// Two-character glyphs are matched before single characters. Unknown
/// characters (including the separating spaces) pass through.
pub fn decode(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        if let Some(pair) = chars.get(i..i + 2) {
            let pair: String = pair.iter().collect();
            if let Some(letter) = letter_for(&pair) {
                out.push(letter);
                i += 2;
                continue;
            }
        }

        if let Some(&c) = chars.get(i) {
            if c != DOT_BELOW {
                let mut buf = [0u8; 4];
                out.push(letter_for(c.encode_utf8(&mut buf)).unwrap_or(c));
            }
        }
        i += 1;
    }

    out
}

/// Apply a translation in the given direction.
pub fn translate(text: &str, direction: Direction) -> String {
    match direction {
        Direction::Encode => encode(text),
        Direction::Decode => decode(text),
    }
}

fn glyph_for(letter: char) -> Option<&'static str> {
    GLYPHS
        .iter()
        .find(|(l, _)| *l == letter)
        .map(|(_, glyph)| *glyph)
}

fn letter_for(glyph: &str) -> Option<char> {
    GLYPHS
        .iter()
        .find(|(_, g)| *g == glyph)
        .map(|(letter, _)| *letter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_word() {
        assert_eq!(encode("ab"), "ᔑ ʖ");
        assert_eq!(encode("Pyx"), "!¡ || \u{307}/");
    }

    #[test]
    fn test_encode_passes_through_unknown() {
        assert_eq!(encode("a1"), "ᔑ 1");
    }

    #[test]
    fn test_decode_multi_char_glyphs() {
        assert_eq!(decode("!¡"), "P");
        assert_eq!(decode("||"), "Y");
        assert_eq!(decode("\u{307}/"), "X");
    }

    #[test]
    fn test_decode_drops_dot_below() {
        assert_eq!(decode("ℸ\u{323}"), "T");
    }

    #[test]
    fn test_every_letter_survives_encode_decode() {
        let alphabet = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
        // decode keeps the separating spaces
        assert_eq!(decode(&encode(alphabet)).replace(' ', ""), alphabet);
    }

    #[test]
    fn test_glyphs_are_distinct() {
        for (i, (_, a)) in GLYPHS.iter().enumerate() {
            for (_, b) in GLYPHS.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_translate_direction() {
        assert_eq!(translate("e", Direction::Encode), "ᒷ");
        assert_eq!(translate("ᒷ", Direction::Decode), "E");
    }
}
