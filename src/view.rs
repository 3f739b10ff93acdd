// 🔎 Filter/Sort Engine
// Pure view over an in-memory card set: explicit config in, ordered subset out

use crate::card::{CardRecord, CardType, Custody, KycLevel, Network, UnknownVariant};
use crate::region::matches_region;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Currency entry that makes a card match every currency selection
pub const GLOBAL_CURRENCY: &str = "Global";

/// Rank given to cards without one when sorting by Featured
pub const UNRANKED: u32 = 999;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// What the viewer asked to see
///
/// Empty lists and empty selections never constrain: they match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub search: String,
    pub card_types: Vec<CardType>,
    pub networks: Vec<Network>,
    pub custody: Vec<Custody>,
    pub min_cashback: f64,
    pub region: String,
    /// `None` = any level; `Some(level)` matches that exact level only
    pub kyc: Option<KycLevel>,
    pub currency: String,
}

impl FilterConfig {
    /// True when no predicate can exclude a card
    pub fn is_unconstrained(&self) -> bool {
        self.search.is_empty()
            && self.card_types.is_empty()
            && self.networks.is_empty()
            && self.custody.is_empty()
            && self.min_cashback == 0.0
            && self.region.is_empty()
            && self.kyc.is_none()
            && self.currency.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOption {
    /// Ascending rank; unranked cards last
    #[default]
    Featured,
    CashbackDescending,
    NameAscending,
    /// Feed order (the feed carries no listing date)
    Newest,
}

impl SortOption {
    pub fn code(&self) -> &'static str {
        match self {
            SortOption::Featured => "featured",
            SortOption::CashbackDescending => "cashback",
            SortOption::NameAscending => "name",
            SortOption::Newest => "newest",
        }
    }
}

impl FromStr for SortOption {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "featured" => Ok(SortOption::Featured),
            "cashback" | "cashbackhigh" | "cashback-desc" => Ok(SortOption::CashbackDescending),
            "name" | "nameaz" | "name-asc" => Ok(SortOption::NameAscending),
            "newest" => Ok(SortOption::Newest),
            _ => Err(UnknownVariant {
                kind: "sort option",
                value: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// VIEW
// ============================================================================

/// Filter then sort. Deterministic and side-effect free; the input is untouched.
pub fn apply_view(records: &[CardRecord], filters: &FilterConfig, sort: SortOption) -> Vec<CardRecord> {
    let mut visible: Vec<CardRecord> = if filters.is_unconstrained() {
        records.to_vec()
    } else {
        records
            .iter()
            .filter(|card| matches_filters(card, filters))
            .cloned()
            .collect()
    };

    sort_cards(&mut visible, sort);
    visible
}

/// Every predicate must hold
pub fn matches_filters(card: &CardRecord, filters: &FilterConfig) -> bool {
    matches_search(card, &filters.search)
        && allows(&filters.card_types, &card.card_type)
        && allows(&filters.networks, &card.network)
        && allows(&filters.custody, &card.custody)
        && matches_cashback(card, filters.min_cashback)
        && matches_region(&card.regions, &filters.region)
        && matches_kyc(card, filters.kyc)
        && matches_currency(card, &filters.currency)
}

fn allows<T: PartialEq>(allow_list: &[T], value: &T) -> bool {
    allow_list.is_empty() || allow_list.contains(value)
}

fn matches_search(card: &CardRecord, search: &str) -> bool {
    let needle = search.to_lowercase();

    card.name.to_lowercase().contains(&needle)
        || card.issuer.to_lowercase().contains(&needle)
        || card.perks.iter().any(|perk| perk.to_lowercase().contains(&needle))
}

/// Text cashback only survives a zero threshold
fn matches_cashback(card: &CardRecord, min_cashback: f64) -> bool {
    match card.cashback.as_percent() {
        Some(value) => value >= min_cashback,
        None => min_cashback == 0.0,
    }
}

fn matches_kyc(card: &CardRecord, selected: Option<KycLevel>) -> bool {
    selected.map_or(true, |level| card.kyc == level)
}

fn matches_currency(card: &CardRecord, currency: &str) -> bool {
    currency.is_empty()
        || card
            .supported_currencies
            .iter()
            .any(|c| c == currency || c == GLOBAL_CURRENCY)
}

// ============================================================================
// SORTING
// ============================================================================

/// Stable sort in place
pub fn sort_cards(cards: &mut [CardRecord], sort: SortOption) {
    match sort {
        SortOption::Featured => cards.sort_by_key(|card| card.rank.unwrap_or(UNRANKED)),
        SortOption::CashbackDescending => cards.sort_by(|a, b| {
            b.cashback.sort_value().total_cmp(&a.cashback.sort_value())
        }),
        SortOption::NameAscending => cards.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortOption::Newest => {}
    }
}

/// Case-insensitive first, raw text as the tie-breaker
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

// ============================================================================
// TEXTUAL REQUESTS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewRequestError {
    #[error(transparent)]
    Unknown(#[from] UnknownVariant),
    #[error("invalid minimum cashback {0:?}: expected a non-negative number")]
    InvalidCashback(String),
}

/// A view as it arrives from a query string or CLI flags
///
/// List fields are comma-separated. Blank fields mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ViewRequest {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub card_type: Option<String>,
    pub network: Option<String>,
    pub custody: Option<String>,
    #[serde(alias = "minCashback")]
    pub min_cashback: Option<String>,
    pub region: Option<String>,
    pub kyc: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl ViewRequest {
    pub fn into_view(self) -> Result<(FilterConfig, SortOption), ViewRequestError> {
        let min_cashback = match non_blank(self.min_cashback.as_deref()) {
            None => 0.0,
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => value,
                _ => return Err(ViewRequestError::InvalidCashback(raw.to_string())),
            },
        };

        let kyc = non_blank(self.kyc.as_deref())
            .filter(|raw| !raw.eq_ignore_ascii_case("any"))
            .map(KycLevel::from_str)
            .transpose()?;

        let sort = non_blank(self.sort.as_deref())
            .map(SortOption::from_str)
            .transpose()?
            .unwrap_or_default();

        let filters = FilterConfig {
            search: self.search.unwrap_or_default().trim().to_string(),
            card_types: parse_list(self.card_type.as_deref())?,
            networks: parse_list(self.network.as_deref())?,
            custody: parse_list(self.custody.as_deref())?,
            min_cashback,
            region: self.region.unwrap_or_default().trim().to_string(),
            kyc,
            currency: self.currency.unwrap_or_default().trim().to_string(),
        };

        Ok((filters, sort))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_list<T: FromStr<Err = UnknownVariant>>(raw: Option<&str>) -> Result<Vec<T>, UnknownVariant> {
    raw.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(T::from_str)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
