//! Chichewa ↔ English translation through the chat model, plus offline
//! language detection.

mod lang;

pub use lang::{Lang, detect_language};

use tracing::{debug, warn};

use crate::openai::{ChatModel, Message, ModelProfile};

const KEEP_MEANING: &str = "Maintain the original meaning, tone, and context. ";
const ONLY_TRANSLATION: &str =
    "Provide only the translation without any explanations or additional text.";

/// Zero-shot translator. Failures never abort a turn: the caller gets a
/// `[Translation failed: ...]` marker wrapping the untranslated input.
#[derive(Clone)]
pub struct Translator<C> {
    llm: C,
    profile: ModelProfile,
}

impl<C: ChatModel> Translator<C> {
    pub fn new(llm: C, profile: ModelProfile) -> Self {
        Self { llm, profile }
    }

    pub async fn to_english(&self, chichewa: &str) -> String {
        let system = format!(
            "You are a professional translator specializing in Chichewa and English. \
             Translate the following text from Chichewa to English. {KEEP_MEANING}{ONLY_TRANSLATION}"
        );
        self.translate(system, chichewa, Lang::Chichewa, Lang::English)
            .await
    }

    pub async fn to_chichewa(&self, english: &str) -> String {
        let system = format!(
            "You are a professional translator specializing in Chichewa and English. \
             Translate the following text from English to Chichewa. {KEEP_MEANING}\
             Use natural, conversational Chichewa that native speakers would understand. \
             {ONLY_TRANSLATION}"
        );
        self.translate(system, english, Lang::English, Lang::Chichewa)
            .await
    }

    /// Translation with an optional topic hint, e.g. "sports news article".
    pub async fn with_context(
        &self,
        text: &str,
        source: Lang,
        target: Lang,
        context: Option<&str>,
    ) -> String {
        let context_info = context
            .map(|c| format!("\nContext: {c}"))
            .unwrap_or_default();
        let (from, to) = (source.name(), target.name());
        let system = format!(
            "You are a professional translator specializing in {from} and {to}. \
             Translate the following text from {from} to {to}.{context_info} \
             {KEEP_MEANING}{ONLY_TRANSLATION}"
        );
        self.translate(system, text, source, target).await
    }

    async fn translate(&self, system: String, text: &str, source: Lang, target: Lang) -> String {
        let request = self
            .profile
            .request(vec![Message::system(system), Message::user(text)]);
        match self.llm.complete(&request).await {
            Ok(translation) => {
                debug!(%source, %target, chars = translation.len(), "translated");
                translation
            }
            Err(e) => {
                warn!(error = %e, %source, %target, "translation failed");
                format!("[Translation failed: {text}]")
            }
        }
    }
}
