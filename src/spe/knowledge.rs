use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classify::QueryIntent;

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed knowledge base: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fee {
    pub item: String,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub key: String,
    pub name: String,
    pub category: String,
    pub target_audience: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub fees: Vec<Fee>,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralInfo {
    pub bank_name: String,
    pub working_hours: String,
    pub customer_service: String,
    pub website: String,
}

/// Hand-curated product catalogue that replaces retrieval for the structured chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub products: Vec<Product>,
    pub general_info: GeneralInfo,
}

impl KnowledgeBase {
    /// Reads the JSON knowledge base at `path`, or falls back to the built-in
    /// catalogue when no file exists there.
    pub fn load_or_builtin(path: &Path) -> Result<Self, KnowledgeError> {
        if !path.exists() {
            info!(path = %path.display(), "no knowledge base file, using built-in catalogue");
            return Ok(Self::builtin());
        }
        let kb: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        debug!(products = kb.products.len(), "knowledge base loaded");
        Ok(kb)
    }

    pub fn product(&self, key: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.key == key)
    }

    /// Prompt context for `intent`, narrowed to one product when it is known.
    pub fn structured_context(&self, intent: QueryIntent, product_key: Option<&str>) -> String {
        match product_key.and_then(|key| self.product(key)) {
            Some(product) => product_context(product, intent),
            None => self.catalogue_context(intent),
        }
    }

    /// Bank-wide contact details, for contact and general-information queries.
    pub fn general_info_context(&self) -> String {
        let info = &self.general_info;
        format!(
            "BANK: {}\nWORKING HOURS: {}\nCUSTOMER SERVICE: {}\nWEBSITE: {}\n\n",
            info.bank_name, info.working_hours, info.customer_service, info.website
        )
    }

    fn catalogue_context(&self, intent: QueryIntent) -> String {
        let mut context = String::from("AVAILABLE BANKING PRODUCTS:\n\n");
        for product in &self.products {
            context.push_str(&format!("• {} ({})\n", product.name, product.category));
            context.push_str(&format!("  Target: {}\n", product.target_audience));
            if matches!(intent, QueryIntent::Benefits | QueryIntent::General) {
                let top: Vec<&str> = product.benefits.iter().take(3).map(String::as_str).collect();
                context.push_str(&format!("  Key Benefits: {}\n", top.join(", ")));
            }
            context.push('\n');
        }
        context
    }

    pub fn builtin() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let fees = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(item, amount)| Fee {
                    item: item.to_string(),
                    amount: amount.to_string(),
                })
                .collect::<Vec<_>>()
        };

        Self {
            products: vec![
                Product {
                    key: "amayi_angathe".into(),
                    name: "Amayi Angathe Business Savings Account".into(),
                    category: "savings".into(),
                    target_audience: "Women entrepreneurs and business owners".into(),
                    benefits: strings(&[
                        "Free monthly maintenance for the first 6 months",
                        "Free ATM card upon account opening",
                        "Low minimum balance of MK 3,000",
                        "Free salary payments via EFT",
                        "50% discount on EFT transaction fees",
                        "Access to Mo626 services without charges",
                    ]),
                    requirements: strings(&[
                        "Valid national ID",
                        "Proof of business registration or trading license",
                        "Initial deposit of MK 3,000",
                        "Passport-sized photograph",
                        "Proof of residence",
                    ]),
                    fees: fees(&[
                        ("monthly_maintenance", "MK 0 (first 6 months), then MK 200"),
                        ("atm_withdrawals", "Free at FDH ATMs, MK 150 at other banks"),
                        ("balance_inquiry", "Free"),
                        ("eft_transfers", "50% discount on standard fees"),
                    ]),
                    features: strings(&[
                        "Mobile banking access",
                        "Internet banking",
                        "ATM/debit card",
                        "Overdraft facility available",
                        "Cheque book available",
                    ]),
                },
                Product {
                    key: "mlimi".into(),
                    name: "Mlimi Loan".into(),
                    category: "loan".into(),
                    target_audience: "Farmers and agricultural businesses".into(),
                    benefits: strings(&[
                        "Competitive interest rates for agriculture",
                        "Flexible repayment schedule aligned with harvest cycles",
                        "Quick loan processing (7-10 days)",
                        "Loan amounts from MK 50,000 to MK 5,000,000",
                        "No collateral required for loans under MK 200,000",
                    ]),
                    requirements: strings(&[
                        "Valid national ID",
                        "Proof of farming activity (land ownership/lease)",
                        "Business plan or farming proposal",
                        "Collateral for loans above MK 200,000",
                        "Bank account with FDH for at least 3 months",
                    ]),
                    fees: fees(&[
                        ("interest_rate", "18-22% per annum (depending on loan size)"),
                        ("processing_fee", "2% of loan amount"),
                        ("insurance", "1.5% of loan amount annually"),
                    ]),
                    features: strings(&[
                        "Grace period available during planting season",
                        "Flexible repayment terms (6-24 months)",
                        "Loan top-up facility for existing customers",
                        "Agricultural insurance options",
                    ]),
                },
            ],
            general_info: GeneralInfo {
                bank_name: "FDH Bank".into(),
                working_hours:
                    "Monday-Friday: 8:00 AM - 5:00 PM, Saturday: 8:00 AM - 12:00 PM".into(),
                customer_service: "Call 313 or +265 1 832 777".into(),
                website: "www.fdhbank.com".into(),
            },
        }
    }
}

fn product_context(product: &Product, intent: QueryIntent) -> String {
    let wants = |section: QueryIntent| intent == section || intent == QueryIntent::General;

    let mut context = format!(
        "PRODUCT: {}\nCATEGORY: {}\nTARGET AUDIENCE: {}\n\n",
        product.name, product.category, product.target_audience
    );

    if wants(QueryIntent::Benefits) {
        push_numbered(&mut context, "BENEFITS", &product.benefits);
    }
    if wants(QueryIntent::Requirements) {
        push_numbered(&mut context, "REQUIREMENTS", &product.requirements);
    }
    if wants(QueryIntent::Fees) {
        context.push_str("FEES:\n");
        for fee in &product.fees {
            context.push_str(&format!("- {}: {}\n", title_case(&fee.item), fee.amount));
        }
        context.push('\n');
    }
    if wants(QueryIntent::Features) {
        push_numbered(&mut context, "FEATURES", &product.features);
    }
    context
}

fn push_numbered(context: &mut String, heading: &str, items: &[String]) {
    context.push_str(heading);
    context.push_str(":\n");
    for (i, item) in items.iter().enumerate() {
        context.push_str(&format!("{}. {item}\n", i + 1));
    }
    context.push('\n');
}

/// `monthly_maintenance` → `Monthly Maintenance`.
fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
