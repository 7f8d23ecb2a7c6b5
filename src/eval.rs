//! Side-by-side evaluation of the retrieval chain and the structured chain on
//! a fixed set of banking queries.

use std::fmt::Write as _;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::classify::{QueryIntent, detect_intent, extract_product};
use crate::corpus::Retriever;
use crate::openai::ChatModel;
use crate::rag::RagChain;
use crate::spe::SpeChain;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalCase {
    pub query_ny: &'static str,
    pub query_en: &'static str,
    pub expected_intent: QueryIntent,
    pub expected_product: Option<&'static str>,
}

const fn case(
    query_ny: &'static str,
    query_en: &'static str,
    expected_intent: QueryIntent,
    expected_product: Option<&'static str>,
) -> EvalCase {
    EvalCase {
        query_ny,
        query_en,
        expected_intent,
        expected_product,
    }
}

pub const EVAL_CASES: &[EvalCase] = &[
    case(
        "Ubwino wa amayi angathe account",
        "Benefits of amayi angathe account",
        QueryIntent::Benefits,
        Some("amayi_angathe"),
    ),
    case(
        "Ndiuzeni za ubwino wa mlimi loan",
        "Tell me about benefits of mlimi loan",
        QueryIntent::Benefits,
        Some("mlimi"),
    ),
    case(
        "Zofunikira za amayi angathe account",
        "Requirements for amayi angathe account",
        QueryIntent::Requirements,
        Some("amayi_angathe"),
    ),
    case(
        "Zofunikira za mlimi loan ndi chani?",
        "What are the requirements for mlimi loan?",
        QueryIntent::Requirements,
        Some("mlimi"),
    ),
    case(
        "Mtengo wa savings account",
        "Cost of savings account",
        QueryIntent::Fees,
        None,
    ),
    case(
        "Kodi amayi angathe account ndi chani?",
        "What is amayi angathe account?",
        QueryIntent::General,
        Some("amayi_angathe"),
    ),
    case(
        "Phindu pa mlimi loan",
        "Interest on mlimi loan",
        QueryIntent::Fees,
        Some("mlimi"),
    ),
];

/// Single query for quick iteration on prompts.
pub const FOCUSED_CASE: EvalCase = EVAL_CASES[0];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApproachRun {
    pub intent: QueryIntent,
    pub product: Option<String>,
    pub answer: String,
    pub sources: Vec<String>,
    pub latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub case: EvalCase,
    pub rag: ApproachRun,
    pub spe: ApproachRun,
}

impl CaseResult {
    pub fn rag_intent_ok(&self) -> bool {
        self.rag.intent == self.case.expected_intent
    }

    pub fn spe_intent_ok(&self) -> bool {
        self.spe.intent == self.case.expected_intent
    }
}

/// Runs every case through both chains, one after the other.
///
/// The retrieval chain does not route on intent; its intent is read off the
/// English query it translated, which is what its retrieval saw.
pub async fn run_comparison<C, R>(
    rag: &RagChain<C, R>,
    spe: &SpeChain<C>,
    cases: &[EvalCase],
) -> Vec<CaseResult>
where
    C: ChatModel,
    R: Retriever,
{
    let mut results = Vec::with_capacity(cases.len());
    for (i, case) in cases.iter().enumerate() {
        info!(test = i + 1, total = cases.len(), query = case.query_ny, "evaluating");

        let start = Instant::now();
        let rag_answer = rag.answer_query(case.query_ny, false).await;
        let rag_latency = start.elapsed();

        let start = Instant::now();
        let spe_answer = spe.answer_query(case.query_ny).await;
        let spe_latency = start.elapsed();

        results.push(CaseResult {
            case: *case,
            rag: ApproachRun {
                intent: detect_intent(&rag_answer.english_query),
                product: extract_product(&rag_answer.english_query).map(str::to_string),
                answer: rag_answer.answer,
                sources: rag_answer.sources,
                latency: rag_latency,
            },
            spe: ApproachRun {
                intent: spe_answer.query_intent,
                product: spe_answer.product,
                answer: spe_answer.answer,
                sources: Vec::new(),
                latency: spe_latency,
            },
        });
    }
    results
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub cases: usize,
    pub rag_accuracy: f64,
    pub spe_accuracy: f64,
    pub rag_mean_latency: Duration,
    pub spe_mean_latency: Duration,
}

impl Summary {
    pub fn from_results(results: &[CaseResult]) -> Self {
        let n = results.len();
        let pct = |hits: usize| if n == 0 { 0.0 } else { hits as f64 / n as f64 * 100.0 };
        let mean = |total: Duration| match u32::try_from(n) {
            Ok(count) if count > 0 => total / count,
            _ => Duration::ZERO,
        };
        Self {
            cases: n,
            rag_accuracy: pct(results.iter().filter(|r| r.rag_intent_ok()).count()),
            spe_accuracy: pct(results.iter().filter(|r| r.spe_intent_ok()).count()),
            rag_mean_latency: mean(results.iter().map(|r| r.rag.latency).sum()),
            spe_mean_latency: mean(results.iter().map(|r| r.spe.latency).sum()),
        }
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rag = self.rag_mean_latency.as_secs_f64();
        let spe = self.spe_mean_latency.as_secs_f64();

        writeln!(f, "Cases: {}", self.cases)?;
        writeln!(f)?;
        writeln!(f, "Intent detection accuracy:")?;
        writeln!(f, "  RAG: {:.0}%", self.rag_accuracy)?;
        writeln!(f, "  SPE: {:.0}%", self.spe_accuracy)?;
        writeln!(f)?;
        writeln!(f, "Average latency:")?;
        writeln!(f, "  RAG: {rag:.2}s")?;
        writeln!(f, "  SPE: {spe:.2}s")?;
        writeln!(f)?;

        let accuracy = if self.rag_accuracy > self.spe_accuracy {
            format!("RAG (+{:.0}%)", self.rag_accuracy - self.spe_accuracy)
        } else if self.spe_accuracy > self.rag_accuracy {
            format!("SPE (+{:.0}%)", self.spe_accuracy - self.rag_accuracy)
        } else {
            "TIE".to_string()
        };
        writeln!(f, "Intent accuracy winner: {accuracy}")?;

        let speed = if rag.max(spe) == 0.0 {
            "TIE".to_string()
        } else if rag < spe {
            format!("RAG ({:.1}% faster)", (spe - rag) / spe * 100.0)
        } else {
            format!("SPE ({:.1}% faster)", (rag - spe) / rag * 100.0)
        };
        write!(f, "Speed winner: {speed}")
    }
}

/// Per-case report block.
pub fn format_case(index: usize, total: usize, result: &CaseResult) -> String {
    let mark = |ok: bool| if ok { "yes" } else { "no" };
    let mut out = String::new();
    let _ = writeln!(out, "[{index}/{total}] {}", result.case.query_ny);
    let _ = writeln!(out, "  English:         {}", result.case.query_en);
    let _ = writeln!(out, "  Expected intent: {}", result.case.expected_intent);
    for (name, run, ok) in [
        ("RAG", &result.rag, result.rag_intent_ok()),
        ("SPE", &result.spe, result.spe_intent_ok()),
    ] {
        let _ = writeln!(
            out,
            "  {name}: intent={} ({}) product={} latency={:.2}s",
            run.intent,
            mark(ok),
            run.product.as_deref().unwrap_or("general"),
            run.latency.as_secs_f64()
        );
        let _ = writeln!(out, "    {}", preview(&run.answer, 300));
        if !run.sources.is_empty() {
            let _ = writeln!(out, "    sources: {}", run.sources.join(", "));
        }
    }
    out
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    match flat.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}
