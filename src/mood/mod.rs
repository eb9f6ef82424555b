//! Mood vocabulary and the text sent to the embedding and chat models.
//!
//! A free-text mood is wrapped in a fixed template before embedding so the
//! query lands closer to the track descriptions in the index. The template
//! always carries the same keyword hints, whatever the mood says.

pub mod prompts;

pub use prompts::{
    analysis_messages, analysis_prompt, recommendation_messages, recommendation_prompt,
    ANALYSIS_SYSTEM_PROMPT, RECOMMENDATION_SYSTEM_PROMPT,
};

/// A mood word and the descriptors that evoke it
#[derive(Debug, Clone, Copy)]
pub struct MoodKeywords {
    /// Mood identifier (lowercase)
    pub id: &'static str,
    /// Descriptor synonyms, lowercase
    pub descriptors: &'static [&'static str],
}

pub const MOOD_HAPPY: MoodKeywords = MoodKeywords {
    id: "happy",
    descriptors: &["joyful", "upbeat", "cheerful", "energetic"],
};

pub const MOOD_SAD: MoodKeywords = MoodKeywords {
    id: "sad",
    descriptors: &["melancholic", "somber", "downbeat", "blue"],
};

pub const MOOD_RELAXED: MoodKeywords = MoodKeywords {
    id: "relaxed",
    descriptors: &["calm", "peaceful", "tranquil", "serene"],
};

pub const MOOD_ENERGETIC: MoodKeywords = MoodKeywords {
    id: "energetic",
    descriptors: &["dynamic", "lively", "vigorous", "powerful"],
};

pub const MOOD_ROMANTIC: MoodKeywords = MoodKeywords {
    id: "romantic",
    descriptors: &["passionate", "tender", "intimate", "loving"],
};

/// Hint lines of the context template, in template order
pub const CONTEXT_HINTS: &[MoodKeywords] = &[
    MOOD_HAPPY,
    MOOD_SAD,
    MOOD_RELAXED,
    MOOD_ENERGETIC,
    MOOD_ROMANTIC,
];

/// Closing sentence of every expanded context
pub const MUSICAL_ELEMENTS_HINT: &str = "Consider musical elements like tempo, energy, \
    instrumentation, and emotional resonance that would create this feeling.";

/// Wrap a raw mood in the embedding context template.
///
/// The result contains `mood` verbatim, followed by one hint line per entry of
/// [`CONTEXT_HINTS`] and the musical elements sentence.
pub fn expand_mood_context(mood: &str) -> String {
    let mut context = format!("Find songs that match this emotional mood or feeling: {mood}.");

    for keywords in CONTEXT_HINTS {
        context.push_str(&format!(
            "\nIf the mood is \"{}\", consider keywords like {}.",
            keywords.id,
            keywords.descriptors.join(", ")
        ));
    }

    context.push('\n');
    context.push_str(MUSICAL_ELEMENTS_HINT);
    context
}
