//! Validation des favoris saisis par l'utilisateur
//!
//! Les coordonnées sont tronquées (jamais arrondies) à 4 décimales. La taille
//! du marqueur dépend de la précision saisie : plus il y a de décimales, plus
//! le marqueur est petit.

use std::fmt;

use crate::error::{AppError, Result};

/// Nombre maximal de décimales conservées
pub const MAX_DECIMALS: usize = 4;

/// Coordonnée normalisée : texte tronqué et valeur correspondante
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinate {
    /// Texte tronqué à `MAX_DECIMALS` décimales
    pub text: String,
    pub value: f64,
    /// Décimales conservées (0..=4)
    pub decimals: usize,
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Normalise une coordonnée saisie
pub fn normalize_coordinate(raw: &str) -> Result<Coordinate> {
    let raw = raw.trim();

    if raw.contains(',') {
        return Err(AppError::input("decimal numbers should not contain ','"));
    }
    if !is_number(raw) {
        return Err(AppError::input("coordinates should be integer or float"));
    }

    let (text, decimals) = match raw.split_once('.') {
        Some((int, frac)) if frac.len() > MAX_DECIMALS => {
            (format!("{}.{}", int, &frac[..MAX_DECIMALS]), MAX_DECIMALS)
        }
        Some((_, frac)) => (raw.to_string(), frac.len()),
        None => (raw.to_string(), 0),
    };

    let value = text
        .parse::<f64>()
        .map_err(|_| AppError::input("coordinates should be integer or float"))?;

    Ok(Coordinate {
        text,
        value,
        decimals,
    })
}

/// Nombre décimal fini, en notation simple (`-100`, `40.5`, `.5`, `+3.`)
fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));

    !(int.is_empty() && frac.is_empty())
        && int.chars().all(|c| c.is_ascii_digit())
        && frac.chars().all(|c| c.is_ascii_digit())
}

/// Classe de taille du marqueur (1 = plus petit, 5 = plus grand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SizeClass(u8);

impl SizeClass {
    pub const MIN: SizeClass = SizeClass(1);
    pub const MAX: SizeClass = SizeClass(5);

    /// 5 − min(décimales, 4)
    pub fn from_decimals(decimals: usize) -> Self {
        SizeClass(5 - decimals.min(MAX_DECIMALS) as u8)
    }

    /// Relit une taille stockée ; hors de 1..=5 elle est ramenée dans l'intervalle
    pub fn from_stored(size: i32) -> Self {
        SizeClass(size.clamp(1, 5) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Classe Font Awesome correspondante
    pub fn fa_class(&self) -> &'static str {
        match self.0 {
            2 => "fa-2x",
            3 => "fa-3x",
            4 => "fa-4x",
            5 => "fa-5x",
            _ => "fa-lg",
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Favori validé, prêt à être enregistré
#[derive(Debug, Clone, PartialEq)]
pub struct NewBookmark {
    pub lon: Coordinate,
    pub lat: Coordinate,
    pub label: String,
    pub size: SizeClass,
}

impl NewBookmark {
    /// La taille dépend de la coordonnée la plus précise
    pub fn new(lon: Coordinate, lat: Coordinate, label: impl Into<String>) -> Self {
        let size = SizeClass::from_decimals(lon.decimals.max(lat.decimals));
        Self {
            lon,
            lat,
            label: label.into(),
            size,
        }
    }
}

/// Valide et normalise un point saisi (longitude, latitude, libellé)
pub fn normalize_point(x: &str, y: &str, label: &str) -> Result<NewBookmark> {
    Ok(NewBookmark::new(
        normalize_coordinate(x)?,
        normalize_coordinate(y)?,
        label,
    ))
}

/// Favori enregistré
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub id: i32,
    pub lon: f64,
    pub lat: f64,
    pub label: String,
    pub size: SizeClass,
}
