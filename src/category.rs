//! Traducción de los códigos numéricos de categoría de YouTube a nombres legibles.

use crate::models::UNKNOWN_CATEGORY;

const CATEGORY_NAMES: &[(&str, &str)] = &[
    ("1", "Film & Animation"),
    ("2", "Autos & Vehicles"),
    ("10", "Music"),
    ("15", "Pets & Animals"),
    ("17", "Sports"),
    ("18", "Short Movies"),
    ("19", "Travel & Events"),
    ("20", "Gaming"),
    ("21", "Video Blogging"),
    ("22", "People & Blogs"),
    ("23", "Comedy"),
    ("24", "Entertainment"),
    ("25", "News & Politics"),
    ("26", "Howto & Style"),
    ("27", "Education"),
    ("28", "Science & Technology"),
    ("29", "Nonprofits & Activism"),
    ("30", "Movies"),
    ("31", "Anime/Animation"),
    ("32", "Action/Adventure"),
    ("33", "Classics"),
    ("34", "Comedy"),
    ("35", "Documentary"),
    ("36", "Drama"),
    ("37", "Family"),
    ("38", "Foreign"),
    ("39", "Horror"),
    ("40", "Sci-Fi/Fantasy"),
    ("41", "Thriller"),
    ("42", "Shorts"),
    ("43", "Shows"),
    ("44", "Trailers"),
];

/// Devuelve el nombre de la categoría, o "Unknown" para cualquier código no registrado.
pub fn resolve(category_code: &str) -> &'static str {
    CATEGORY_NAMES
        .iter()
        .find(|(code, _)| *code == category_code)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_CATEGORY)
}
