// ⚖️ Compare - side-by-side attribute rows for a chosen set of cards

use crate::card::CardRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareRow {
    pub label: &'static str,
    /// One cell per compared card, same order as `Comparison::card_ids`
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub card_ids: Vec<String>,
    pub card_names: Vec<String>,
    pub rows: Vec<CompareRow>,
    /// Requested ids that are not in the record set
    pub missing: Vec<String>,
    /// Known ids left out because `MAX_COMPARE_CARDS` were already selected
    pub over_limit: Vec<String>,
}

/// Most cards shown side by side
pub const MAX_COMPARE_CARDS: usize = 4;

type Formatter = fn(&CardRecord) -> String;

const COMPARE_ROWS: &[(&str, Formatter)] = &[
    ("Type", format_type),
    ("Network", format_network),
    ("Custody", format_custody),
    ("Cashback", format_cashback),
    ("Annual Fee", |c| c.annual_fee.clone()),
    ("FX Fee", |c| c.fx_fee.clone()),
    ("KYC", format_kyc),
    ("Assets", |c| c.supported_assets.clone()),
    ("Metal", |c| yes_no(c.metal)),
    ("Bonus", |c| c.signup_bonus.clone()),
    ("Regions", |c| or_na(&c.regions)),
];

/// Build comparison rows for `ids`, in the requested order
///
/// Unknown ids are reported in `missing`; a repeated id is shown once.
/// Only the first `MAX_COMPARE_CARDS` known cards are compared.
pub fn compare_cards<S: AsRef<str>>(records: &[CardRecord], ids: &[S]) -> Comparison {
    let mut selected: Vec<&CardRecord> = Vec::new();
    let mut missing = Vec::new();
    let mut over_limit: Vec<String> = Vec::new();

    for id in ids {
        let id = id.as_ref();
        if selected.iter().any(|card| card.id == id) || over_limit.iter().any(|skipped| skipped == id) {
            continue;
        }
        match records.iter().find(|card| card.id == id) {
            Some(card) if selected.len() < MAX_COMPARE_CARDS => selected.push(card),
            Some(card) => over_limit.push(card.id.clone()),
            None => missing.push(id.to_string()),
        }
    }

    let rows = COMPARE_ROWS
        .iter()
        .map(|&(label, format)| CompareRow {
            label,
            values: selected.iter().map(|card| format(*card)).collect(),
        })
        .collect();

    Comparison {
        card_ids: selected.iter().map(|card| card.id.clone()).collect(),
        card_names: selected.iter().map(|card| card.name.clone()).collect(),
        rows,
        missing,
        over_limit,
    }
}

fn format_type(card: &CardRecord) -> String {
    card.card_type.name().to_string()
}

fn format_network(card: &CardRecord) -> String {
    card.network.name().to_string()
}

fn format_cashback(card: &CardRecord) -> String {
    card.cashback.to_string()
}

fn format_kyc(card: &CardRecord) -> String {
    card.kyc.name().to_string()
}

/// Self-Custody and Non-Custodial read the same in a comparison
fn format_custody(card: &CardRecord) -> String {
    if card.custody.is_user_held() {
        "Self-Custody".to_string()
    } else {
        card.custody.name().to_string()
    }
}

fn yes_no(flag: bool) -> String {
    let text = if flag { "Yes" } else { "No" };
    text.to_string()
}

fn or_na(text: &str) -> String {
    if text.is_empty() {
        "N/A".to_string()
    } else {
        text.to_string()
    }
}
