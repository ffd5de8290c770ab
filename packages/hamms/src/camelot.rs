//! Camelot wheel key normalization
//!
//! Accepts either musical notation ("C", "Am", "F#m") or Camelot
//! notation ("8B", "12a") and maps it onto a single scalar position.
//! Unknown or unparsable input resolves to the neutral 0.5 sentinel.

/// Musical key name to Camelot code mapping
///
/// The 24 canonical spellings; lookups are ASCII-case-insensitive.
const KEY_TABLE: [(&str, &str); 24] = [
    ("C", "8B"),
    ("Am", "8A"),
    ("G", "9B"),
    ("Em", "9A"),
    ("D", "10B"),
    ("Bm", "10A"),
    ("A", "11B"),
    ("F#m", "11A"),
    ("E", "12B"),
    ("C#m", "12A"),
    ("B", "1B"),
    ("G#m", "1A"),
    ("Gb", "2B"),
    ("Ebm", "2A"),
    ("Db", "3B"),
    ("Bbm", "3A"),
    ("Ab", "4B"),
    ("Fm", "4A"),
    ("Eb", "5B"),
    ("Cm", "5A"),
    ("Bb", "6B"),
    ("Gm", "6A"),
    ("F", "7B"),
    ("Dm", "7A"),
];

/// Tonal mode inferred from a key string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    Major,
    Minor,
    /// Key absent or unparsable
    Unknown,
}

/// One half of the Camelot wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Letter {
    A,
    B,
}

/// Parse Camelot notation like "8B" or "12a"
fn parse_camelot(code: &str) -> Option<(u8, Letter)> {
    let code = code.trim();
    if code.len() < 2 || code.len() > 3 {
        return None;
    }
    let (digits, letter) = code.split_at(code.len() - 1);
    let number: u8 = digits.parse().ok()?;
    if !(1..=12).contains(&number) {
        return None;
    }
    match letter {
        "A" | "a" => Some((number, Letter::A)),
        "B" | "b" => Some((number, Letter::B)),
        _ => None,
    }
}

/// Look up a key name in the canonical table, case-insensitively
fn lookup_key_name(name: &str) -> Option<(u8, Letter)> {
    let name = name.trim();
    KEY_TABLE
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, code)| parse_camelot(code))
}

/// Resolve any accepted key spelling to a wheel slot
///
/// Resolution order: Camelot notation, exact key name, then a suffixed
/// minor ("Gbm") falls back to its root's slot. The fallback keeps
/// unusual enharmonic spellings on the wheel instead of discarding
/// them.
fn resolve(key: &str) -> Option<(u8, Letter, KeyMode)> {
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    if let Some((n, letter)) = parse_camelot(key) {
        let mode = match letter {
            Letter::A => KeyMode::Minor,
            Letter::B => KeyMode::Major,
        };
        return Some((n, letter, mode));
    }

    if let Some((n, letter)) = lookup_key_name(key) {
        let mode = if key.ends_with(['m', 'M']) && key.len() > 1 {
            KeyMode::Minor
        } else {
            match letter {
                Letter::A => KeyMode::Minor,
                Letter::B => KeyMode::Major,
            }
        };
        return Some((n, letter, mode));
    }

    // "A minor" / "Gb min" style suffixes, then bare suffixed minors
    let stripped = key
        .strip_suffix("minor")
        .or_else(|| key.strip_suffix("min"))
        .or_else(|| key.strip_suffix('m'))
        .map(str::trim);
    if let Some(root) = stripped {
        // Canonical minor spelling first ("A minor" -> "Am"), then the
        // root's own slot for spellings outside the table ("Gbm" -> "Gb")
        if let Some((n, letter)) = lookup_key_name(&format!("{}m", root)) {
            return Some((n, letter, KeyMode::Minor));
        }
        if let Some((n, letter)) = lookup_key_name(root) {
            return Some((n, letter, KeyMode::Minor));
        }
    }
    let stripped_major = key.strip_suffix("major").or_else(|| key.strip_suffix("maj"));
    if let Some(root) = stripped_major.map(str::trim) {
        if let Some((n, letter)) = lookup_key_name(root) {
            return Some((n, letter, KeyMode::Major));
        }
    }

    None
}

/// Normalize a key string to its Camelot wheel position
///
/// `((n - 1) / 12) + 0.5` for the B half, clamped to `[0, 1]`; unknown
/// input returns exactly 0.5.
pub fn normalize_key(key: &str) -> f64 {
    match resolve(key) {
        Some((n, letter, _)) => {
            let mut base = f64::from(n - 1) / 12.0;
            if letter == Letter::B {
                base += 0.5;
            }
            base.clamp(0.0, 1.0)
        }
        None => 0.5,
    }
}

/// Infer the tonal mode of a key string
pub fn key_mode(key: &str) -> KeyMode {
    match resolve(key) {
        Some((_, _, mode)) => mode,
        None => KeyMode::Unknown,
    }
}
