//! Instruction text normalization
//!
//! Directions providers return instruction strings in whatever phrasing and
//! language they happen to use. A fixed phrase-substitution table rewrites
//! the known directional phrases into the app's display strings; anything
//! unrecognized or empty falls back to a generic instruction so the UI never
//! shows an empty banner.

use phf::phf_map;

/// Shown when the provider gave us nothing usable.
pub const FALLBACK_INSTRUCTION: &str = "Continue straight";

static PHRASES: phf::Map<&'static str, &'static str> = phf_map! {
    "turn left" => "Turn left",
    "turn right" => "Turn right",
    "turn sharp left" => "Turn sharp left",
    "turn sharp right" => "Turn sharp right",
    "sharp left" => "Turn sharp left",
    "sharp right" => "Turn sharp right",
    "slight left" => "Keep slightly left",
    "slight right" => "Keep slightly right",
    "keep left" => "Keep left",
    "keep right" => "Keep right",
    "continue straight" => "Continue straight",
    "go straight" => "Continue straight",
    "head toward" => "Head toward",
    "head towards" => "Head toward",
    "arrive at" => "Arrive at",
    "arrive" => "Arrive",
    "arrived at" => "Arrive at",
    "u-turn" => "Make a U-turn",
    "uturn" => "Make a U-turn",
    "make a u-turn" => "Make a U-turn",
};

/// Rewrite a provider instruction into a display string.
///
/// The earliest known phrase in the text wins; at equal positions the
/// longest match wins, so "head towards" is not clipped to "head toward".
/// Text after the matched phrase (typically the street name) is preserved.
pub fn localize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FALLBACK_INSTRUCTION.to_owned();
    }

    let mut best: Option<(usize, &str, &str)> = None;
    for (&phrase, &display) in PHRASES.entries() {
        if let Some(pos) = find_ascii_ci(trimmed, phrase) {
            let better = match best {
                None => true,
                Some((best_pos, best_phrase, _)) => {
                    pos < best_pos || (pos == best_pos && phrase.len() > best_phrase.len())
                }
            };
            if better {
                best = Some((pos, phrase, display));
            }
        }
    }

    match best {
        Some((pos, phrase, display)) => {
            let tail = &trimmed[pos + phrase.len()..];
            format!("{display}{tail}")
        }
        None => FALLBACK_INSTRUCTION.to_owned(),
    }
}

/// Byte-wise ASCII-case-insensitive substring search. The table's phrases
/// are all ASCII, and an ASCII byte never occurs inside a multi-byte UTF-8
/// sequence, so byte offsets from a match are valid char boundaries.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
