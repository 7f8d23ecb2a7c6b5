//! Query routing: model-backed one-word classification plus keyword-based
//! intent and product detection.

mod intent;

pub use intent::{QueryIntent, detect_intent, extract_product};

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::openai::{ChatModel, Message, ModelProfile};

/// Route for the news-corpus chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Greeting,
    OutOfScope,
    Relevant,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Greeting => "greeting",
            QueryType::OutOfScope => "out_of_scope",
            QueryType::Relevant => "relevant",
        }
    }

    fn parse(label: &str) -> Option<Self> {
        match label {
            "greeting" => Some(QueryType::Greeting),
            "out_of_scope" => Some(QueryType::OutOfScope),
            "relevant" => Some(QueryType::Relevant),
            _ => None,
        }
    }
}

/// Route for the bank-products chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BankQueryType {
    Greeting,
    OutOfScope,
    ProductInquiry,
    ComparisonQuery,
    ProcedureQuestion,
    ContactInquiry,
    GeneralInfo,
}

impl BankQueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            BankQueryType::Greeting => "greeting",
            BankQueryType::OutOfScope => "out_of_scope",
            BankQueryType::ProductInquiry => "product_inquiry",
            BankQueryType::ComparisonQuery => "comparison_query",
            BankQueryType::ProcedureQuestion => "procedure_question",
            BankQueryType::ContactInquiry => "contact_inquiry",
            BankQueryType::GeneralInfo => "general_info",
        }
    }

    fn parse(label: &str) -> Option<Self> {
        match label {
            "greeting" => Some(BankQueryType::Greeting),
            "out_of_scope" => Some(BankQueryType::OutOfScope),
            "product_inquiry" => Some(BankQueryType::ProductInquiry),
            "comparison_query" => Some(BankQueryType::ComparisonQuery),
            "procedure_question" => Some(BankQueryType::ProcedureQuestion),
            "contact_inquiry" => Some(BankQueryType::ContactInquiry),
            "general_info" => Some(BankQueryType::GeneralInfo),
            _ => None,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BankQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const NEWS_PROMPT: &str = r#"You are a query classifier for a chatbot that answers questions about news articles.

Classify the following query into ONE of these categories:
- "greeting": If it's a greeting, hello, how are you, etc.
- "out_of_scope": If it's about weather, math, current events outside the documents, personal advice, etc.
- "relevant": If it's asking about news, events, people, or information that could be in news articles

Query: {query}

Respond with ONLY ONE WORD: greeting, out_of_scope, or relevant"#;

const BANK_PROMPT: &str = r#"You are a query classifier for a bank products chatbot.

Classify the following query into ONE of these categories:
- "greeting": Greetings, hello, how are you, thank you, goodbye
- "out_of_scope": Weather, math, current events, personal advice, non-banking topics
- "product_inquiry": Questions about specific bank products (accounts, loans, cards, services)
- "comparison_query": Comparing multiple products or asking about differences
- "procedure_question": How to open account, apply for loan, use service, requirements
- "contact_inquiry": Phone numbers, email addresses, branch locations, contact information
- "general_info": General banking information, fees, rates, terms

Query: {query}

Respond with ONLY ONE WORD from the categories above."#;

/// Asks the model for a one-word label. Unknown labels and model errors fall
/// back to the chain's default route rather than failing the turn.
#[derive(Clone)]
pub struct Classifier<C> {
    llm: C,
    profile: ModelProfile,
}

impl<C: ChatModel> Classifier<C> {
    pub fn new(llm: C, profile: ModelProfile) -> Self {
        Self { llm, profile }
    }

    pub async fn news(&self, english_query: &str) -> QueryType {
        self.label(NEWS_PROMPT, english_query)
            .await
            .and_then(|l| QueryType::parse(&l))
            .unwrap_or(QueryType::Relevant)
    }

    pub async fn banking(&self, english_query: &str) -> BankQueryType {
        self.label(BANK_PROMPT, english_query)
            .await
            .and_then(|l| BankQueryType::parse(&l))
            .unwrap_or(BankQueryType::ProductInquiry)
    }

    async fn label(&self, template: &str, query: &str) -> Option<String> {
        let prompt = template.replace("{query}", query);
        let request = self.profile.request(vec![Message::user(prompt)]);
        match self.llm.complete(&request).await {
            Ok(reply) => {
                let label = normalize_label(&reply);
                debug!(%label, "query classified");
                Some(label)
            }
            Err(e) => {
                warn!(error = %e, "classification failed, using default route");
                None
            }
        }
    }
}

/// Lowercases and strips the quotes and trailing punctuation models like to add.
fn normalize_label(reply: &str) -> String {
    reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '.' || c == '`')
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::OpenAiError;
    use crate::openai::mock::ScriptedChat;

    fn classifier(chat: &ScriptedChat) -> Classifier<ScriptedChat> {
        Classifier::new(chat.clone(), ModelProfile::new("gpt-4", 0.0))
    }

    #[tokio::test]
    async fn news_labels_are_parsed() {
        let chat = ScriptedChat::replies(&["greeting", " Out_Of_Scope\n", "\"relevant\"."]);
        let c = classifier(&chat);
        assert_eq!(c.news("Hello").await, QueryType::Greeting);
        assert_eq!(c.news("What's 2 + 2?").await, QueryType::OutOfScope);
        assert_eq!(c.news("Tell me about sports").await, QueryType::Relevant);
    }

    #[tokio::test]
    async fn news_prompt_embeds_query_at_zero_temperature() {
        let chat = ScriptedChat::replies(&["relevant"]);
        classifier(&chat).news("Who won the match?").await;

        let request = &chat.requests()[0];
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.contains("Query: Who won the match?"));
        assert!(!request.messages[0].content.contains("{query}"));
    }

    #[tokio::test]
    async fn unknown_label_defaults_per_chain() {
        let chat = ScriptedChat::replies(&["maybe", "sports"]);
        let c = classifier(&chat);
        assert_eq!(c.news("x").await, QueryType::Relevant);
        assert_eq!(c.banking("x").await, BankQueryType::ProductInquiry);
    }

    #[tokio::test]
    async fn model_error_defaults_per_chain() {
        let chat = ScriptedChat::default();
        chat.push(Err(OpenAiError::RateLimited));
        chat.push(Err(OpenAiError::EmptyResponse));
        let c = classifier(&chat);
        assert_eq!(c.news("x").await, QueryType::Relevant);
        assert_eq!(c.banking("x").await, BankQueryType::ProductInquiry);
    }

    #[tokio::test]
    async fn banking_labels_are_parsed() {
        let chat = ScriptedChat::replies(&["contact_inquiry", "comparison_query", "general_info"]);
        let c = classifier(&chat);
        assert_eq!(c.banking("phone number?").await, BankQueryType::ContactInquiry);
        assert_eq!(c.banking("mlimi vs amayi").await, BankQueryType::ComparisonQuery);
        assert_eq!(c.banking("opening hours").await, BankQueryType::GeneralInfo);
        assert!(chat.prompt(0).contains("bank products chatbot"));
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        for t in [QueryType::Greeting, QueryType::OutOfScope, QueryType::Relevant] {
            assert_eq!(QueryType::parse(t.as_str()), Some(t));
        }
        assert_eq!(
            serde_json::to_string(&BankQueryType::ProcedureQuestion).unwrap(),
            "\"procedure_question\""
        );
    }
}
