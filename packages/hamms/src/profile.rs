//! Closed genre profile table for derived dimensions
//!
//! Each known genre carries baseline values for the nine derived
//! dimensions. Unknown or absent genres resolve to the neutral profile;
//! lookups are done on the lowercased hint.

/// Per-genre baselines for the derived vector dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GenreProfile {
    pub danceability: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub rhythm: f64,
    pub brightness: f64,
    pub tempo_stability: f64,
    pub harmonic_complexity: f64,
    pub dynamic_range: f64,
}

/// Neutral profile used for unknown genres and missing hints
pub(crate) const NEUTRAL: GenreProfile = GenreProfile {
    danceability: 0.5,
    valence: 0.5,
    acousticness: 0.5,
    instrumentalness: 0.5,
    rhythm: 0.5,
    brightness: 0.5,
    tempo_stability: 0.5,
    harmonic_complexity: 0.5,
    dynamic_range: 0.5,
};

macro_rules! profile {
    ($($field:ident : $value:expr),* $(,)?) => {
        GenreProfile { $($field: $value,)* ..NEUTRAL }
    };
}

/// Look up the profile for a lowercased genre hint
pub(crate) fn genre_profile(genre: &str) -> GenreProfile {
    match genre {
        "house" => profile! {
            danceability: 0.9, valence: 0.8, acousticness: 0.1, rhythm: 0.7,
            brightness: 0.7, tempo_stability: 0.9, harmonic_complexity: 0.4,
            dynamic_range: 0.3,
        },
        "techno" => profile! {
            danceability: 0.95, acousticness: 0.05, rhythm: 0.8, brightness: 0.8,
            tempo_stability: 0.95, harmonic_complexity: 0.4, dynamic_range: 0.25,
        },
        "trance" => profile! {
            danceability: 0.8, acousticness: 0.1, rhythm: 0.6, brightness: 0.75,
            tempo_stability: 0.9,
        },
        "edm" => profile! {
            danceability: 0.9, acousticness: 0.1, brightness: 0.8,
            tempo_stability: 0.85, dynamic_range: 0.25,
        },
        "electronic" => profile! {
            danceability: 0.7, valence: 0.6, acousticness: 0.15, brightness: 0.7,
            tempo_stability: 0.8,
        },
        "dance" => profile! { danceability: 0.9, valence: 0.8 },
        "club" => profile! { danceability: 0.85 },
        "dubstep" => profile! { acousticness: 0.05 },
        "disco" => profile! { danceability: 0.85, valence: 0.9 },
        "funk" => profile! { danceability: 0.8, valence: 0.8 },
        "pop" => profile! {
            valence: 0.7, instrumentalness: 0.1, rhythm: 0.4,
            harmonic_complexity: 0.3, dynamic_range: 0.3,
        },
        "rock" => profile! { instrumentalness: 0.2, dynamic_range: 0.7 },
        "metal" => profile! { dynamic_range: 0.6 },
        "jazz" => profile! {
            acousticness: 0.7, rhythm: 0.9, tempo_stability: 0.4,
            harmonic_complexity: 0.9, dynamic_range: 0.8,
        },
        "classical" => profile! {
            acousticness: 0.9, instrumentalness: 0.9, rhythm: 0.7,
            harmonic_complexity: 0.8, dynamic_range: 0.9,
        },
        "folk" => profile! { acousticness: 0.9 },
        "acoustic" => profile! { acousticness: 0.95 },
        "country" => profile! { acousticness: 0.8 },
        "ambient" => profile! {
            valence: 0.4, instrumentalness: 0.8, rhythm: 0.2, brightness: 0.3,
            dynamic_range: 0.7,
        },
        "darkwave" => profile! { valence: 0.2, brightness: 0.25 },
        "industrial" => profile! { valence: 0.3 },
        "doom" => profile! { brightness: 0.2 },
        "prog" => profile! {
            rhythm: 0.8, tempo_stability: 0.6, harmonic_complexity: 0.8,
        },
        "fusion" => profile! { harmonic_complexity: 0.7 },
        "experimental" => profile! { harmonic_complexity: 0.8 },
        "instrumental" => profile! { instrumentalness: 0.95 },
        "post-rock" => profile! { instrumentalness: 0.7 },
        "soundtrack" => profile! { instrumentalness: 0.6 },
        "r&b" => profile! { instrumentalness: 0.1 },
        "soul" => profile! { instrumentalness: 0.15 },
        _ => NEUTRAL,
    }
}
