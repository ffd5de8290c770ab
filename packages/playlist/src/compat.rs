//! Subgenre compatibility matrix
//!
//! A fixed symmetric table over genre families. Subgenre strings map
//! onto families by keyword; identical subgenre names are always fully
//! compatible, and pairs the table does not know score the neutral 0.5.

/// Genre families the matrix is indexed by, in matrix order
const FAMILIES: [&str; 8] = [
    "house", "techno", "trance", "disco", "funk", "pop", "rock", "ambient",
];

/// Symmetric compatibility values, FAMILIES x FAMILIES
const MATRIX: [[f64; 8]; 8] = [
    // house techno trance disco funk  pop   rock  ambient
    [1.0, 0.8, 0.7, 0.8, 0.7, 0.6, 0.3, 0.4], // house
    [0.8, 1.0, 0.8, 0.6, 0.5, 0.4, 0.3, 0.4], // techno
    [0.7, 0.8, 1.0, 0.5, 0.4, 0.5, 0.3, 0.5], // trance
    [0.8, 0.6, 0.5, 1.0, 0.9, 0.8, 0.4, 0.3], // disco
    [0.7, 0.5, 0.4, 0.9, 1.0, 0.7, 0.5, 0.3], // funk
    [0.6, 0.4, 0.5, 0.8, 0.7, 1.0, 0.7, 0.4], // pop
    [0.3, 0.3, 0.3, 0.4, 0.5, 0.7, 1.0, 0.3], // rock
    [0.4, 0.4, 0.5, 0.3, 0.3, 0.4, 0.3, 1.0], // ambient
];

/// Keyword aliases folded into a family
fn family_index(subgenre: &str) -> Option<usize> {
    let lower = subgenre.to_lowercase();
    let aliases: [(usize, &[&str]); 8] = [
        (0, &["house", "garage"]),
        (1, &["techno", "electro", "edm", "dance"]),
        (2, &["trance", "progressive"]),
        (3, &["disco", "boogie"]),
        (4, &["funk", "soul", "r&b", "motown"]),
        (5, &["pop", "synth", "wave"]),
        (6, &["rock", "punk", "metal", "grunge", "indie"]),
        (7, &["ambient", "downtempo", "chill", "drone"]),
    ];
    aliases
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(index, _)| *index)
}

/// Compatibility between two subgenre names, in [0, 1]
pub fn compatibility(a: &str, b: &str) -> f64 {
    if a.eq_ignore_ascii_case(b) {
        return 1.0;
    }
    match (family_index(a), family_index(b)) {
        (Some(i), Some(j)) => MATRIX[i][j],
        _ => 0.5,
    }
}

/// Compatibility when either subgenre may be unknown
///
/// Two unknowns mix reasonably (0.8); a known subgenre against an
/// unknown one is a coin toss (0.5).
pub fn compatibility_opt(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => compatibility(a, b),
        (None, None) => 0.8,
        _ => 0.5,
    }
}
