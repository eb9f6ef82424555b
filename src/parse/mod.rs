//! Parsers for the free text that flows through the pipeline.
//!
//! Both parsers are total: malformed input degrades to documented defaults
//! instead of failing, so one bad record or model line never fails a request.

pub mod metadata;
pub mod recommendation;

pub use metadata::{extract_song_fields, extract_with_fallback, SongFields};
pub use recommendation::{parse_recommendation_line, parse_recommendations, Recommendation};
