//! Prompts for the analysis and recommendation stages.

use crate::llm::ChatMessage;
use crate::types::MatchedSong;

pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a music expert who understands how musical elements create emotional responses.";

pub const RECOMMENDATION_SYSTEM_PROMPT: &str = "You are a music recommendation expert. \
    Suggest songs based on musical patterns and user preferences.";

/// Number of recommendations requested from the model
pub const RECOMMENDATION_COUNT: usize = 5;

/// One block per matched song: title, artist, album, popularity, similarity.
fn song_list(songs: &[MatchedSong]) -> String {
    songs
        .iter()
        .map(|song| {
            format!(
                "\"{}\" by {}\nAlbum: {}\nPopularity: {}\nSimilarity: {}%",
                song.name,
                song.artist,
                song.album,
                song.popularity,
                song.similarity_percent()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Ask why the matched songs fit the mood.
pub fn analysis_prompt(mood: &str, songs: &[MatchedSong]) -> String {
    format!(
        "The user is feeling \"{mood}\".\n\n\
         These songs from their music library match this mood:\n{}\n\n\
         What musical elements make these songs appropriate for a {mood} mood? \
         Consider tempo, key, instrumentation, vocal style, and emotional qualities.",
        song_list(songs)
    )
}

/// Ask for fresh songs sharing the analysed characteristics.
pub fn recommendation_prompt(mood: &str, analysis: &str, songs: &[MatchedSong]) -> String {
    let liked = songs
        .iter()
        .map(|song| format!("- {} by {}", song.name, song.artist))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Based on this analysis of what creates a {mood} mood:\n{analysis}\n\n\
         The user enjoys these songs:\n{liked}\n\n\
         Recommend {RECOMMENDATION_COUNT} different songs that:\n\
         1. Share similar musical characteristics\n\
         2. Match the {mood} mood\n\
         3. Are from different artists and genres\n\
         4. Would be fresh discoveries for the user\n\n\
         Format each recommendation as:\n\
         Song Title - Artist - Genre1, Genre2\n\n\
         Don't include numbering or quotes in the song titles."
    )
}

pub fn analysis_messages(mood: &str, songs: &[MatchedSong]) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
        ChatMessage::user(analysis_prompt(mood, songs)),
    ]
}

pub fn recommendation_messages(
    mood: &str,
    analysis: &str,
    songs: &[MatchedSong],
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(RECOMMENDATION_SYSTEM_PROMPT),
        ChatMessage::user(recommendation_prompt(mood, analysis, songs)),
    ]
}
