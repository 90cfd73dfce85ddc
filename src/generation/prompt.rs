//! Prompt construction for playlist generation.

use chrono::{Datelike, NaiveDate};
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

use crate::llm::Message;

lazy_static! {
    static ref TRENDING_WORDS: Regex =
        Regex::new(r"(?i)\b(trending|popular|viral|current|latest)\b").expect("trending regex");
    static ref NEW_WORD: Regex = Regex::new(r"(?i)\bnew\b").expect("new regex");
}

/// Strips emoji pictographs and collapses whitespace.
pub fn clean_mood(raw: &str) -> String {
    let without_emoji: String = raw.chars().filter(|c| !is_pictograph(*c)).collect();
    without_emoji.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_pictograph(c: char) -> bool {
    matches!(
        c as u32,
        0x1F1E6..=0x1F1FF | 0x1F300..=0x1FAFF | 0x2600..=0x27BF | 0xFE0F | 0x200D
    )
}

/// Hints pulled out of the mood text that steer the release-year focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoodSignals {
    pub trending: bool,
    pub mentions_recent_year: bool,
    pub wants_new: bool,
}

impl MoodSignals {
    pub fn analyze(mood: &str, current_year: i32) -> Self {
        let mentions_recent_year = [current_year, current_year - 1]
            .iter()
            .any(|year| mood.contains(&year.to_string()));
        Self {
            trending: TRENDING_WORDS.is_match(mood),
            mentions_recent_year,
            wants_new: NEW_WORD.is_match(mood),
        }
    }

    pub fn recent_focus(&self) -> bool {
        self.trending || self.mentions_recent_year || self.wants_new
    }
}

/// `{unix_millis}_{0..10000}`, only there to discourage cached answers.
pub fn new_session_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let nonce: u32 = rand::rng().random_range(0..10000);
    format!("{}_{}", millis, nonce)
}

pub fn build_messages(mood: &str, count: usize, session_id: &str, today: NaiveDate) -> Vec<Message> {
    let year = today.year();
    let signals = MoodSignals::analyze(mood, year);
    let date = today.format("%B %-d, %Y");

    let year_focus = if signals.recent_focus() {
        format!(
            "Focus heavily on {}-{} releases. Prioritize very recent songs that are trending NOW.",
            year - 1,
            year
        )
    } else {
        format!(
            "Mix songs from {}-{}, with emphasis on recent years ({}-{}).",
            year - 5,
            year,
            year - 2,
            year
        )
    };

    let mut context = Vec::new();
    if signals.trending {
        context.push(format!(
            "- User wants TRENDING/POPULAR songs: focus on viral hits and current chart-toppers from {}-{}",
            year - 1,
            year
        ));
    }
    if signals.mentions_recent_year {
        context.push("- User mentioned specific recent years: prioritize songs from that timeframe".to_string());
    }
    let context = if context.is_empty() {
        "- No special context".to_string()
    } else {
        context.join("\n")
    };

    let closing = if signals.trending {
        format!("FOCUS ON TRENDING/VIRAL SONGS FROM {}-{}!", year - 1, year)
    } else {
        "Include songs in multiple languages and from various cultures!".to_string()
    };

    let system = format!(
        "You are a globally-minded music curator with deep knowledge of international music from {from}-{year}. \
Current date: {date}. ALWAYS respond with ONLY valid JSON. Suggest varied artists, genres, languages and countries, \
and avoid repeating earlier suggestions. When users mention \"trending\", \"popular\", \"viral\", \"current\" or a recent year, \
prefer songs from {prev}-{year} that are actually trending. Current session: {session_id}",
        from = year - 5,
        prev = year - 1,
    );

    let user = format!(
        r#"You are an expert music curator with knowledge of music from {from} to {year} from all over the world. Current date: {date}.

CRITICAL INSTRUCTIONS:
- Return ONLY valid JSON, no text before or after
- Return exactly {count} UNIQUE songs
- Use double quotes for ALL strings, never single quotes
- Do NOT add trailing commas
- {year_focus}

CONTEXT ANALYSIS for "{mood}":
{context}

GLOBAL DIVERSITY:
- Include songs from different countries, cultures and languages
- Mix international mainstream hits with regional favourites
- Represent at least 4 different countries in the playlist

REQUIRED FIELDS for each song:
- title: string (song name, any language)
- artist: string
- releaseYear: number (no quotes around numbers)
- searchQuery: string (romanized "title artist" for searching)
- reasoning: string (max 50 characters explaining the mood connection)

Return ONLY this exact JSON format:
[
  {{
    "title": "Song Title",
    "artist": "Artist Name",
    "releaseYear": {year},
    "searchQuery": "Song Title Artist Name",
    "reasoning": "Matches the mood"
  }}
]

Generate a globally diverse playlist for mood: "{mood}"
Session ID: {session_id}
{closing}"#,
        from = year - 5,
    );

    vec![Message::system(system), Message::user(user)]
}
