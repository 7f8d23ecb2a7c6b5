use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Chichewa,
    English,
}

impl Lang {
    /// Language name as it appears inside prompts.
    pub fn name(self) -> &'static str {
        match self {
            Lang::Chichewa => "Chichewa",
            Lang::English => "English",
        }
    }

    pub fn other(self) -> Lang {
        match self {
            Lang::Chichewa => Lang::English,
            Lang::English => Lang::Chichewa,
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lang::Chichewa => "chichewa",
            Lang::English => "english",
        })
    }
}

/// Common Chichewa function words, greetings, question words, and banking
/// vocabulary that do not collide with English words.
const CHICHEWA_WORDS: &[&str] = &[
    "moni", "muli", "bwanji", "bwino", "kodi", "ndi", "za", "wa", "ya", "cha", "ku", "mu",
    "pa", "kuti", "komanso", "kapena", "ngati", "chifukwa", "ndiye", "zomwe", "chiyani",
    "chani", "zingati", "angati", "liti", "uti", "ndani", "nanga", "ndiuzeni",
    "ndikufuna", "kudziwa", "zambiri", "nkhani", "nkhaniyi", "iyi", "ili", "ine", "inu",
    "ife", "iwo", "zikomo", "chonde", "pepani", "eya", "ayi", "lero", "dzulo", "mawa",
    "masewera", "anthu", "ubwino", "zofunikira", "mtengo", "phindu", "ndalama", "ngongole",
    "wawa", "zikuyenda", "mungathe", "ndingathe", "ndingatsegule",
];

/// Verb prefixes that mark Chichewa inflection (e.g. "ndikufuna", "anakhudzidwa").
const CHICHEWA_PREFIXES: &[&str] = &["ndiku", "ndima", "ndina", "mukufu", "anakh", "ikukh", "zikuy"];

/// Minimum share of marker words for a text to count as Chichewa.
const MARKER_RATIO: f32 = 0.25;

/// Best-effort language detection without a model call.
///
/// Text is Chichewa when at least a quarter of its words are known Chichewa
/// markers; anything else, including empty input, is English.
pub fn detect_language(text: &str) -> Lang {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphabetic() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();

    if words.is_empty() {
        return Lang::English;
    }

    let markers = words.iter().filter(|w| is_chichewa_marker(w)).count();
    if markers > 0 && markers as f32 / words.len() as f32 >= MARKER_RATIO {
        Lang::Chichewa
    } else {
        Lang::English
    }
}

fn is_chichewa_marker(word: &str) -> bool {
    let word = word.rsplit('\'').next().unwrap_or(word);
    CHICHEWA_WORDS.contains(&word) || CHICHEWA_PREFIXES.iter().any(|p| word.starts_with(p))
}
