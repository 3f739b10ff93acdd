// 🏗️ Feed Parser - spreadsheet CSV → CardRecord
// Unrecognized values fall back to a default variant, never an error

use crate::card::{Cashback, CardRecord, CardType, Custody, KycLevel, Network};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Dataset compiled into the binary, used whenever the live feed is unavailable
pub const BUNDLED_FEED: &str = include_str!("../data/cards.csv");

/// Number of cards in `BUNDLED_FEED`
pub const BUNDLED_CARD_COUNT: usize = 12;

/// Free-text columns that together make up the perk list, in display order
pub const PERK_COLUMNS: [&str; 3] = [
    "Cashback & Rewards",
    "Yield / Interest / APY",
    "Lifestyle & Travel",
];

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Parse a raw CSV export into card records
///
/// Blank lines are ignored, the first remaining line is the header row and
/// every following line becomes one record. Missing columns read as empty
/// strings. When an id repeats, the first record wins.
pub fn parse_feed(raw: &str) -> Vec<CardRecord> {
    let rows = parse_rows(raw);

    let mut seen = HashSet::new();
    let mut cards = Vec::with_capacity(rows.len());

    for row in &rows {
        let card = row_to_card(row);
        if !seen.insert(card.id.clone()) {
            warn!(id = %card.id, "Duplicate card id in feed, keeping first occurrence");
            continue;
        }
        cards.push(card);
    }

    debug!(rows = rows.len(), cards = cards.len(), "Parsed card feed");
    cards
}

/// Cards from the bundled dataset
pub fn bundled_cards() -> Vec<CardRecord> {
    parse_feed(BUNDLED_FEED)
}

// ============================================================================
// CSV → ROWS
// ============================================================================

/// Zip the header row with each data row
///
/// Every non-blank line is one record: quoting never spans lines, so an
/// unbalanced quote only affects the rest of its own line. Quoted fields may
/// contain commas and `""` escapes. Rows shorter than the header are padded
/// with empty strings, longer rows are cut. A header that appears twice keeps
/// the value of its last column.
pub fn parse_rows(raw: &str) -> Vec<HashMap<String, String>> {
    let mut lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let header = loop {
        match lines.next() {
            None => return Vec::new(),
            Some((line_num, line)) => match read_line(line) {
                Ok(record) => break record,
                Err(e) => {
                    warn!(line = line_num + 1, error = %e, "Skipping unreadable header row");
                }
            },
        }
    };

    let mut rows = Vec::new();

    for (line_num, line) in lines {
        let record = match read_line(line) {
            Ok(record) => record,
            Err(e) => {
                warn!(line = line_num + 1, error = %e, "Skipping unreadable feed row");
                continue;
            }
        };

        let row: HashMap<String, String> = header
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let value = record.get(index).unwrap_or("");
                (name.to_string(), value.to_string())
            })
            .collect();

        rows.push(row);
    }

    rows
}

/// One line as one record; an open quote runs to the end of the line
fn read_line(line: &str) -> Result<StringRecord, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

fn row_to_card(row: &HashMap<String, String>) -> CardRecord {
    // Absent column → default; present but empty column → empty string
    let field = |name: &str, default: &str| -> String {
        row.get(name).cloned().unwrap_or_else(|| default.to_string())
    };
    let text = |name: &str| field(name, "");

    let perk_sources: Vec<String> = PERK_COLUMNS.iter().map(|column| text(*column)).collect();

    CardRecord {
        id: text("id"),
        name: text("name"),
        issuer: text("issuer"),
        card_type: parse_card_type(&text("type")),
        network: parse_network(&text("network")),
        cashback: parse_cashback(&text("maxCashback")),
        cashback_min: text("minCashback"),
        annual_fee: field("annualFee", "Free"),
        fx_fee: field("fxFee", "Not specified"),
        perks: parse_perks(&perk_sources),
        signup_bonus: field("signupBonus", "None"),
        custody: parse_custody(&text("custody")),
        regions: text("regions"),
        official_link: text("officialLink"),
        metal: parse_boolean(&text("metal")),
        supported_assets: text("supportedAssets"),
        kyc: parse_kyc(&text("KYC")),
        supported_currencies: parse_currencies(&text("supportedCurrencies")),
        rank: parse_rank(&text("rank")),
        age: text("Age"),
        airdrop_farming: text("Airdrop Farming"),
    }
}

// ============================================================================
// FIELD NORMALIZERS
// ============================================================================

/// "5%" → 5.0, "2.5% in BTC" → 2.5, "Up to 8%" stays text, "" → "N/A"
pub fn parse_cashback(value: &str) -> Cashback {
    let cleaned = value.replacen('%', "", 1);

    match leading_number(cleaned.trim()) {
        Some(number) => Cashback::Numeric(number),
        None if value.is_empty() => Cashback::Unspecified("N/A".to_string()),
        None => Cashback::Unspecified(value.to_string()),
    }
}

/// Longest unsigned decimal prefix ("12.5abc" → 12.5)
fn leading_number(s: &str) -> Option<f64> {
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (index, c) in s.char_indices() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = index + c.len_utf8();
    }

    if !seen_digit {
        return None;
    }

    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

pub fn parse_custody(value: &str) -> Custody {
    match value.trim().to_lowercase().as_str() {
        "self-custody" => Custody::SelfCustody,
        "non-custodial" => Custody::NonCustodial,
        "hybrid" => Custody::Hybrid,
        _ => Custody::Custodial,
    }
}

/// Anything unrecognized requires full KYC
pub fn parse_kyc(value: &str) -> KycLevel {
    match value.trim().to_lowercase().as_str() {
        "light" => KycLevel::Light,
        "no" | "none" => KycLevel::None,
        _ => KycLevel::Required,
    }
}

pub fn parse_card_type(value: &str) -> CardType {
    match value.trim().to_lowercase().as_str() {
        "credit" => CardType::Credit,
        "prepaid" => CardType::Prepaid,
        _ => CardType::Debit,
    }
}

pub fn parse_network(value: &str) -> Network {
    let normalized = value.trim().to_lowercase();

    if normalized.contains("visa") && normalized.contains("mastercard") {
        Network::VisaMastercard
    } else if normalized == "mastercard" {
        Network::Mastercard
    } else {
        Network::Visa
    }
}

pub fn parse_boolean(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

pub fn parse_currencies(value: &str) -> Vec<String> {
    split_pipe_list(value)
}

/// Concatenate the perk columns, each a `|`-separated list; empty columns add nothing
pub fn parse_perks<S: AsRef<str>>(sources: &[S]) -> Vec<String> {
    sources
        .iter()
        .map(|section| section.as_ref())
        .filter(|section| !section.trim().is_empty())
        .flat_map(split_pipe_list)
        .collect()
}

fn parse_rank(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn split_pipe_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
