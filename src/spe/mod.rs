//! Structured prompt engineering: the whole (small) knowledge base is laid out
//! in the prompt instead of being retrieved, and answers are written directly
//! in the user's language.

mod knowledge;

pub use knowledge::KnowledgeBase;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{BankQueryType, Classifier, QueryIntent, detect_intent, extract_product};
use crate::openai::{ChatModel, Message, ModelProfile};
use crate::phrases::PhraseBook;
use crate::translate::{Lang, Translator, detect_language};

pub const APPROACH: &str = "structured_prompt_engineering";

const APOLOGY_CHICHEWA: &str = "Pepani, panali vuto pakupanga yankho. Mungafunse mwanjira ina?";
const APOLOGY_ENGLISH: &str = "I apologize, there was an error generating the answer. \
                               Could you try rephrasing your question?";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeAnswer {
    pub answer: String,
    pub query_type: BankQueryType,
    pub query_intent: QueryIntent,
    pub product: Option<String>,
    pub english_query: String,
    pub detected_language: Lang,
    pub approach: &'static str,
}

fn intent_instruction(intent: QueryIntent) -> &'static str {
    match intent {
        QueryIntent::Benefits => {
            "Focus ONLY on benefits and advantages. Do NOT discuss requirements or fees unless specifically asked."
        }
        QueryIntent::Requirements => {
            "Focus ONLY on requirements and eligibility criteria. Do NOT discuss benefits."
        }
        QueryIntent::Fees => "Focus ONLY on fees, costs, and charges. Be specific about amounts.",
        QueryIntent::Features => "Focus on how the product works and its features.",
        QueryIntent::General => "Provide a balanced overview covering key aspects.",
    }
}

pub struct SpeChain<C> {
    llm: C,
    answer_profile: ModelProfile,
    translator: Translator<C>,
    classifier: Classifier<C>,
    knowledge: KnowledgeBase,
    phrases: PhraseBook,
}

impl<C: ChatModel + Clone> SpeChain<C> {
    pub fn new(
        llm: C,
        answer_profile: ModelProfile,
        translation_profile: ModelProfile,
        classifier_profile: ModelProfile,
        knowledge: KnowledgeBase,
        phrases: PhraseBook,
    ) -> Self {
        Self {
            translator: Translator::new(llm.clone(), translation_profile),
            classifier: Classifier::new(llm.clone(), classifier_profile),
            llm,
            answer_profile,
            knowledge,
            phrases,
        }
    }
}

impl<C: ChatModel> SpeChain<C> {
    /// Detect → translate (Chichewa only) → classify → intent → product →
    /// context → generate in the detected language.
    pub async fn answer_query(&self, user_query: &str) -> SpeAnswer {
        let detected_language = detect_language(user_query);
        let english_query = match detected_language {
            Lang::Chichewa => self.translator.to_english(user_query).await,
            Lang::English => user_query.to_string(),
        };

        let query_type = self.classifier.banking(&english_query).await;
        let query_intent = detect_intent(&english_query);
        let product = extract_product(&english_query);
        let mut context = self.knowledge.structured_context(query_intent, product);
        if matches!(query_type, BankQueryType::ContactInquiry | BankQueryType::GeneralInfo) {
            context.push_str(&self.knowledge.general_info_context());
        }
        info!(
            language = %detected_language,
            %query_type,
            intent = %query_intent,
            product = product.unwrap_or("general"),
            context_chars = context.len(),
            "structured query routed"
        );

        let answer = self
            .generate_answer(&english_query, &context, detected_language, query_intent)
            .await;

        SpeAnswer {
            answer,
            query_type,
            query_intent,
            product: product.map(str::to_string),
            english_query,
            detected_language,
            approach: APPROACH,
        }
    }

    pub async fn generate_answer(
        &self,
        english_query: &str,
        structured_context: &str,
        target: Lang,
        intent: QueryIntent,
    ) -> String {
        let prompt = match target {
            Lang::Chichewa => self.chichewa_prompt(english_query, structured_context, intent),
            Lang::English => english_prompt(english_query, structured_context, intent),
        };
        let request = self.answer_profile.request(vec![Message::user(prompt)]);
        match self.llm.complete(&request).await {
            Ok(answer) => {
                debug!(chars = answer.len(), "structured answer generated");
                answer
            }
            Err(e) => {
                warn!(error = %e, "structured answer generation failed");
                match target {
                    Lang::Chichewa => APOLOGY_CHICHEWA.to_string(),
                    Lang::English => APOLOGY_ENGLISH.to_string(),
                }
            }
        }
    }

    fn chichewa_prompt(&self, english_query: &str, context: &str, intent: QueryIntent) -> String {
        let instruction = intent_instruction(intent);
        let guidelines = self.phrases.generation_guidelines();
        format!(
            "Ndinu wothandiza wa banki yomwe ikuthandiza maklienti kudziwa zambiri za zinthu za banki.

ZAMBIRI ZA ZINTHU ZA BANKI (Structured Knowledge Base):
{context}

FUNSO LA MUNTHU (mu Chingerezi): {english_query}

MALANGIZO A NKHANI:
{instruction}

{guidelines}

MALANGIZO OFUNIKIRA:
- Yankhani m'CHICHEWA CHOYAMBA chachilengedwe (osati kumasulira mawu ndi mawu)
- Gwiritsani ntchito zambiri zomwe zaperekedwa pamwambapa
- Sungani mawu a banking mu Chingerezi (account, loan, ATM, MK, EFT, etc.)
- Khalani ochezera, wothandiza, ndi woyamba
- Gwiritsani ntchito mawu olumikizana a Chichewa (komanso, zomwe, moti, motsatira, chifukwa, etc.)
- Konzani yankho bwino ndi ma bullet points ngati pali zambiri
- Maliza ndi kupereka thandizo

YANKHANI M'CHICHEWA (osati kumasulira, koma kulemba mwachibadwa):"
        )
    }
}

fn english_prompt(english_query: &str, context: &str, intent: QueryIntent) -> String {
    let instruction = intent_instruction(intent);
    format!(
        "You are a friendly, knowledgeable bank assistant helping customers understand banking products and services.

STRUCTURED KNOWLEDGE BASE:
{context}

Customer's Question: {english_query}

FOCUS INSTRUCTION:
{instruction}

Instructions:
- Provide a warm, conversational answer based on the structured information above
- Be specific and include relevant details
- Use a friendly, helpful tone (not robotic or overly formal)
- Format the answer clearly with bullet points or paragraphs as appropriate
- End with an offer to help further if needed

Answer:"
    )
}
