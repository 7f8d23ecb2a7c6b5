//! English → Chichewa phrase mappings used to steer generated Chichewa
//! toward how native speakers actually talk.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum PhraseError {
    #[error("failed to read phrase file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed phrase file: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct PhraseRow {
    english_phrase: String,
    chichewa_translation: String,
    #[serde(default)]
    context_notes: String,
    #[serde(default)]
    formality_level: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhraseEntry {
    pub chichewa: String,
    pub context: String,
    pub formality: String,
}

/// Phrases worth showing the model, in priority order.
const HIGH_VALUE_PHRASES: &[&str] = &[
    "Sure",
    "I understand",
    "Thank you for asking",
    "I can help with that",
    "Hello",
    "Hi",
    "We have",
    "You can",
    "For example",
    "Please note",
    "If you have any questions",
    "I hope this helps",
];

/// Translations that mark a phrase as "do not translate literally".
const PLACEHOLDERS: &[&str] = &["SKIP", "REPHRASE"];

pub const GUIDELINE_EXAMPLES: usize = 15;

#[derive(Debug, Clone, Default)]
pub struct PhraseBook {
    entries: HashMap<String, PhraseEntry>,
}

impl PhraseBook {
    /// Loads the mapping CSV. A missing file yields an empty book; the
    /// guidelines still work without examples.
    pub fn load(path: &Path) -> Result<Self, PhraseError> {
        if !path.exists() {
            warn!(path = %path.display(), "phrase mappings not found, continuing without examples");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        let book = Self::parse(&text)?;
        debug!(phrases = book.len(), "phrase mappings loaded");
        Ok(book)
    }

    pub fn parse(text: &str) -> Result<Self, PhraseError> {
        let text = text.trim_start_matches('\u{feff}');
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let mut entries = HashMap::new();
        for row in reader.deserialize::<PhraseRow>() {
            let row = row?;
            entries.insert(
                row.english_phrase,
                PhraseEntry {
                    chichewa: row.chichewa_translation,
                    context: row.context_notes,
                    formality: row.formality_level,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, english: &str) -> Option<&PhraseEntry> {
        self.entries.get(english)
    }

    /// `"English" → "Chichewa"` lines for the high-value phrases that have a
    /// usable translation, at most `limit` of them.
    pub fn examples(&self, limit: usize) -> Vec<String> {
        HIGH_VALUE_PHRASES
            .iter()
            .filter_map(|phrase| {
                let entry = self.entries.get(*phrase)?;
                let chichewa = entry.chichewa.trim();
                if chichewa.is_empty() || PLACEHOLDERS.contains(&chichewa) {
                    return None;
                }
                Some(format!("\"{phrase}\" → \"{chichewa}\""))
            })
            .take(limit)
            .collect()
    }

    /// Style guide for generating natural Chichewa, with phrase examples.
    pub fn generation_guidelines(&self) -> String {
        let mut guidelines = String::from(
            "
CHICHEWA RESPONSE GUIDELINES:

1. NATURAL CONVERSATIONAL STYLE:
   - Use everyday Chichewa that native speakers use
   - Avoid word-for-word translations from English
   - Use natural sentence flow and structure
   - Be warm, friendly, and helpful

2. TECHNICAL TERMS:
   - Keep banking/financial terms in English (account, loan, ATM, MK, EFT, etc.)
   - Use Chichewa for explanations and connectors
   - Examples: \"savings account\", \"mobile banking\", \"interest rate\"

3. COMMON PHRASE TRANSLATIONS:
",
        );

        for example in self.examples(GUIDELINE_EXAMPLES) {
            guidelines.push_str(&format!("   - {example}\n"));
        }

        guidelines.push_str(
            "
4. NATURAL CONNECTORS (use these liberally):
   - \"komanso\" (and also), \"zomwe\" (which), \"moti\" (so that)
   - \"motsatira\" (according to), \"ndi uwu\" (here they are)
   - \"ndiye\" (so/therefore), \"kenako\" (then/next)
   - \"chifukwa\" (because), \"ngati\" (if)

5. SKIP THESE (don't translate directly):
   - \"Unfortunately\" → just state the fact
   - \"Actually\" → restructure naturally
   - \"Well\" → skip or use \"Ndiye\"
   - Formal greetings → use casual ones or skip

6. OPENING RESPONSES:
   - Prefer starting directly with content
   - If greeting needed: \"Zikomo\" or context-specific greeting
   - NEVER use \"Moni\" (too formal/textbook)
   - Examples: \"Zikuyenda bwanji\", \"Wawa\", \"Ndamva\"

7. STRUCTURE:
   - Answer the question directly
   - Use bullet points for lists (with Chichewa explanations)
   - End helpfully (e.g., \"Ngati muli ndi mafunso ena, mutha kufunsa\")
",
        );
        guidelines
    }
}
