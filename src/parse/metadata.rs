//! Recovers song fields from the text blob stored with each indexed track.
//!
//! # Grammar
//!
//! The blob is read line by line:
//!
//! - Any line containing `": "` is a `key: value` pair. The key is the trimmed
//!   text before the first `": "`, the value is the trimmed remainder. Only the
//!   first occurrence of a key counts.
//! - A line containing `artist": {` (or `album": {`) opens a nested JSON-ish
//!   object. From that line on, the first line containing `name": "` supplies the
//!   quoted name, which wins over the flat `artist` (or `album`) value.
//!
//! Missing values fall back to the structured payload (when available) and then
//! to the defaults below.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::storage::TrackMetadata;

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

const ARTIST_OBJECT_MARKER: &str = r#"artist": {"#;
const ALBUM_OBJECT_MARKER: &str = r#"album": {"#;
const NESTED_NAME_MARKER: &str = r#"name": ""#;

/// Song fields recovered from an indexed entry. Always fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongFields {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub popularity: i64,
    pub preview_url: Option<String>,
    pub uri: Option<String>,
}

/// What the text actually said, before defaults are applied.
#[derive(Debug, Default)]
struct ParsedText {
    name: Option<String>,
    artist: Option<String>,
    album: Option<String>,
    popularity: Option<i64>,
    preview_url: Option<String>,
    uri: Option<String>,
}

impl ParsedText {
    fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();

        let mut flat: HashMap<&str, &str> = HashMap::new();
        for line in &lines {
            if let Some((key, value)) = line.split_once(": ") {
                let key = key.trim();
                if !key.is_empty() {
                    flat.entry(key).or_insert_with(|| value.trim());
                }
            }
        }

        let get = |key: &str| {
            flat.get(key)
                .copied()
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            name: get("name"),
            artist: nested_name(&lines, ARTIST_OBJECT_MARKER).or_else(|| get("artist")),
            album: nested_name(&lines, ALBUM_OBJECT_MARKER).or_else(|| get("album")),
            popularity: get("popularity").and_then(|p| parse_leading_int(&p)),
            preview_url: get("preview_url").filter(|url| !is_none_literal(url)),
            uri: get("uri"),
        }
    }

    /// Fill gaps from the structured payload stored next to the text.
    fn or_structured(mut self, metadata: &TrackMetadata) -> Self {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.trim().to_string());

        self.name = self.name.or_else(|| non_empty(&metadata.name));
        self.artist = self
            .artist
            .or_else(|| metadata.artists.first().and_then(|a| non_empty(a)));
        self.album = self
            .album
            .or_else(|| metadata.album.as_deref().and_then(non_empty));
        self.uri = self.uri.or_else(|| non_empty(&metadata.uri));
        self
    }

    fn into_fields(self) -> SongFields {
        SongFields {
            name: self.name.unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            artist: self.artist.unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: self.album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            popularity: self.popularity.unwrap_or(0),
            preview_url: self.preview_url,
            uri: self.uri,
        }
    }
}

/// Name inside the first nested object opened by `marker`, if any.
fn nested_name(lines: &[&str], marker: &str) -> Option<String> {
    let start = lines.iter().position(|line| line.contains(marker))?;
    let line = lines[start..]
        .iter()
        .find(|line| line.contains(NESTED_NAME_MARKER))?;
    let (_, rest) = line.split_once(NESTED_NAME_MARKER)?;

    let value = match rest.find('"') {
        Some(end) => &rest[..end],
        None => rest.trim_end().trim_end_matches([',', '"']),
    };

    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Integer prefix of `s`: `"72"`, `"72.5"` and `"72 points"` all give 72.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let digits_start = usize::from(s.starts_with(['-', '+']));
    let digits_len = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    s[..digits_start + digits_len].parse().ok()
}

fn is_none_literal(value: &str) -> bool {
    value == "None" || value == "null"
}

/// Extract song fields from a text blob alone.
pub fn extract_song_fields(text: &str) -> SongFields {
    ParsedText::parse(text).into_fields()
}

/// Extract song fields from an indexed entry: the text blob first, then the
/// structured payload, then defaults.
pub fn extract_with_fallback(metadata: &TrackMetadata) -> SongFields {
    ParsedText::parse(&metadata.text)
        .or_structured(metadata)
        .into_fields()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_fields_with_defaults() {
        let fields = extract_song_fields("name: Foo\nartist: Bar\n");

        assert_eq!(
            fields,
            SongFields {
                name: "Foo".to_string(),
                artist: "Bar".to_string(),
                album: UNKNOWN_ALBUM.to_string(),
                popularity: 0,
                preview_url: None,
                uri: None,
            }
        );
    }

    #[test]
    fn test_preview_url_none_literal_is_absent() {
        let fields = extract_song_fields("name: Foo\npreview_url: None\n");
        assert_eq!(fields.preview_url, None);

        let fields = extract_song_fields("preview_url: https://p.scdn.co/mp3-preview/abc");
        assert_eq!(
            fields.preview_url.as_deref(),
            Some("https://p.scdn.co/mp3-preview/abc")
        );
    }

    #[test]
    fn test_total_on_garbage() {
        for input in ["", "\n\n", "{not json", "::::", ": value", "artist\": {", "💥"] {
            let fields = extract_song_fields(input);
            assert_eq!(fields.name, UNKNOWN_TRACK, "input: {input:?}");
            assert_eq!(fields.artist, UNKNOWN_ARTIST, "input: {input:?}");
            assert_eq!(fields.album, UNKNOWN_ALBUM, "input: {input:?}");
            assert_eq!(fields.popularity, 0);
            assert_eq!(fields.preview_url, None);
            assert_eq!(fields.uri, None);
        }
    }

    #[test]
    fn test_first_occurrence_wins() {
        let text = "name: Outer Song\naudio_features: {\n  name: inner\n}\nname: Later";
        assert_eq!(extract_song_fields(text).name, "Outer Song");
    }

    #[test]
    fn test_value_keeps_extra_separators() {
        let fields = extract_song_fields("name: Interlude: Part 2\nuri: spotify:track:xyz");
        assert_eq!(fields.name, "Interlude: Part 2");
        assert_eq!(fields.uri.as_deref(), Some("spotify:track:xyz"));
    }

    #[test]
    fn test_nested_objects_override_flat_values() {
        let text = r#"name: Midnight City
artist: flat artist
"artist": {
  "uri": "spotify:artist:63MQldklfxkjYDoUE4Tppz",
  "name": "M83",
}
"album": {
  "name": "Hurry Up, We're Dreaming",
}
popularity: 72"#;

        let fields = extract_song_fields(text);
        assert_eq!(fields.name, "Midnight City");
        assert_eq!(fields.artist, "M83");
        assert_eq!(fields.album, "Hurry Up, We're Dreaming");
        assert_eq!(fields.popularity, 72);
    }

    #[test]
    fn test_nested_name_without_closing_quote() {
        let text = "\"artist\": {\n  \"name\": \"Daft Punk,";
        assert_eq!(extract_song_fields(text).artist, "Daft Punk");
    }

    #[test]
    fn test_popularity_parsing() {
        assert_eq!(extract_song_fields("popularity: 55").popularity, 55);
        assert_eq!(extract_song_fields("popularity: 55.9").popularity, 55);
        assert_eq!(extract_song_fields("popularity: high").popularity, 0);
        assert_eq!(extract_song_fields("popularity: ").popularity, 0);
        assert_eq!(parse_leading_int("-"), None);
        assert_eq!(parse_leading_int("+7"), Some(7));
    }

    #[test]
    fn test_fallback_to_structured_payload() {
        let metadata = TrackMetadata::new("spotify:track:1", "Structured Name")
            .with_text("popularity: 10\nartists: name: A, name: B")
            .with_artists(vec!["A".to_string(), "B".to_string()])
            .with_album("Structured Album");

        let fields = extract_with_fallback(&metadata);
        assert_eq!(fields.name, "Structured Name");
        assert_eq!(fields.artist, "A");
        assert_eq!(fields.album, "Structured Album");
        assert_eq!(fields.popularity, 10);
        assert_eq!(fields.uri.as_deref(), Some("spotify:track:1"));
    }

    #[test]
    fn test_text_wins_over_structured_payload() {
        let metadata = TrackMetadata::new("spotify:track:1", "Structured Name")
            .with_text("name: Text Name\nartist: Text Artist\nuri: spotify:track:text");

        let fields = extract_with_fallback(&metadata);
        assert_eq!(fields.name, "Text Name");
        assert_eq!(fields.artist, "Text Artist");
        assert_eq!(fields.uri.as_deref(), Some("spotify:track:text"));
    }
}
