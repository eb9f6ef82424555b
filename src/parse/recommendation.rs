//! Parses the recommendation model's reply.
//!
//! The model is asked for one song per line as
//! `Song Title - Artist - Genre1, Genre2`. Blank lines are dropped, stray list
//! markers and quotes are removed, and every remaining line becomes one
//! [`Recommendation`].

use serde::{Deserialize, Serialize};

use super::metadata::UNKNOWN_ARTIST;

/// Genre list used when a line carries no genre part.
pub const UNKNOWN_GENRE: &str = "Genre Unknown";

/// A song proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// `rec_<n>`, the position among the non-blank reply lines
    pub id: String,
    pub track_name: String,
    pub artist_name: String,
    /// Never empty
    pub genres: Vec<String>,
}

/// Parse every non-blank line of a model reply.
pub fn parse_recommendations(text: &str) -> Vec<Recommendation> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(index, line)| parse_recommendation_line(line, index))
        .collect()
}

/// Parse a single `Title - Artist - Genre, Genre` line.
///
/// Fields are split on ` - ` when the line uses spaced dashes, so hyphenated
/// names like "Jay-Z" survive; otherwise on any `-`. At most three parts are
/// taken and the third keeps any further dashes.
pub fn parse_recommendation_line(line: &str, index: usize) -> Recommendation {
    let cleaned = strip_list_marker(line.trim()).replace(['"', '“', '”'], "");

    let parts: Vec<&str> = if cleaned.contains(" - ") {
        cleaned.splitn(3, " - ").map(trim_part).collect()
    } else {
        cleaned.splitn(3, '-').map(trim_part).collect()
    };

    let track_name = parts.first().copied().unwrap_or_default().to_string();

    let artist_name = parts
        .get(1)
        .copied()
        .filter(|a| !a.is_empty())
        .unwrap_or(UNKNOWN_ARTIST)
        .to_string();

    let mut genres: Vec<String> = parts
        .get(2)
        .map(|g| {
            g.split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if genres.is_empty() {
        genres.push(UNKNOWN_GENRE.to_string());
    }

    Recommendation {
        id: format!("rec_{index}"),
        track_name,
        artist_name,
        genres,
    }
}

/// Trim whitespace and dangling dashes from a split field.
fn trim_part(part: &str) -> &str {
    part.trim_matches(|c: char| c.is_whitespace() || c == '-')
}

/// Drop a leading `1.`, `2)`, `-`, `*` or `•` list marker.
fn strip_list_marker(line: &str) -> &str {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
        return line;
    }

    for bullet in ["- ", "* ", "• "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return rest.trim_start();
        }
    }
    line
}
