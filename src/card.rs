// 💳 Card Model - typed records for the card catalog
// Everything the feed parser produces and the view engine consumes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENUMERATED FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Credit,
    Debit,
    Prepaid,
}

impl CardType {
    pub fn name(&self) -> &'static str {
        match self {
            CardType::Credit => "Credit",
            CardType::Debit => "Debit",
            CardType::Prepaid => "Prepaid",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Visa,
    Mastercard,
    #[serde(rename = "Visa/Mastercard")]
    VisaMastercard,
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Visa => "Visa",
            Network::Mastercard => "Mastercard",
            Network::VisaMastercard => "Visa/Mastercard",
        }
    }
}

/// Who holds the underlying crypto assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Custody {
    Custodial,
    #[serde(rename = "Self-Custody")]
    SelfCustody,
    #[serde(rename = "Non-Custodial")]
    NonCustodial,
    Hybrid,
}

impl Custody {
    pub fn name(&self) -> &'static str {
        match self {
            Custody::Custodial => "Custodial",
            Custody::SelfCustody => "Self-Custody",
            Custody::NonCustodial => "Non-Custodial",
            Custody::Hybrid => "Hybrid",
        }
    }

    /// Self-Custody and Non-Custodial are the same thing to a reader
    pub fn is_user_held(&self) -> bool {
        matches!(self, Custody::SelfCustody | Custody::NonCustodial)
    }
}

/// Identity verification tier required to use the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KycLevel {
    Required,
    Light,
    None,
}

impl KycLevel {
    pub fn name(&self) -> &'static str {
        match self {
            KycLevel::Required => "Required",
            KycLevel::Light => "Light",
            KycLevel::None => "None",
        }
    }
}

/// Error for strict name lookups (view requests, not feed rows)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}

// Strict parsing: accepts the display name or its lowercase form and
// nothing else. The lenient feed normalizers live in `parser`.

impl FromStr for CardType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "credit" => Ok(CardType::Credit),
            "debit" => Ok(CardType::Debit),
            "prepaid" => Ok(CardType::Prepaid),
            _ => Err(UnknownVariant::new("card type", s)),
        }
    }
}

impl FromStr for Network {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "visa" => Ok(Network::Visa),
            "mastercard" => Ok(Network::Mastercard),
            "visa/mastercard" => Ok(Network::VisaMastercard),
            _ => Err(UnknownVariant::new("network", s)),
        }
    }
}

impl FromStr for Custody {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "custodial" => Ok(Custody::Custodial),
            "self-custody" => Ok(Custody::SelfCustody),
            "non-custodial" => Ok(Custody::NonCustodial),
            "hybrid" => Ok(Custody::Hybrid),
            _ => Err(UnknownVariant::new("custody model", s)),
        }
    }
}

impl FromStr for KycLevel {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "required" => Ok(KycLevel::Required),
            "light" => Ok(KycLevel::Light),
            "none" => Ok(KycLevel::None),
            _ => Err(UnknownVariant::new("KYC level", s)),
        }
    }
}

// ============================================================================
// CASHBACK
// ============================================================================

/// Maximum cashback: either a non-negative percentage or free text ("N/A",
/// "Up to 8%", ...). Serializes as a bare number or a bare string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cashback {
    Numeric(f64),
    Unspecified(String),
}

impl Cashback {
    pub fn as_percent(&self) -> Option<f64> {
        match self {
            Cashback::Numeric(value) => Some(*value),
            Cashback::Unspecified(_) => None,
        }
    }

    /// Value used for ordering; text sentinels count as zero
    pub fn sort_value(&self) -> f64 {
        self.as_percent().unwrap_or(0.0)
    }
}

impl fmt::Display for Cashback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cashback::Numeric(value) => write!(f, "{}%", value),
            Cashback::Unspecified(text) if text.is_empty() => write!(f, "N/A"),
            Cashback::Unspecified(text) => write!(f, "{}", text),
        }
    }
}

// ============================================================================
// CARD RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub card_type: CardType,
    pub network: Network,
    pub cashback: Cashback,
    pub cashback_min: String,
    pub annual_fee: String,
    pub fx_fee: String,
    pub perks: Vec<String>,
    pub signup_bonus: String,
    pub custody: Custody,
    /// Free text, comma/keyword based ("Global, excl. US")
    pub regions: String,
    pub official_link: String,
    pub metal: bool,
    pub supported_assets: String,
    pub kyc: KycLevel,
    pub supported_currencies: Vec<String>,
    /// Lower = more featured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub age: String,
    pub airdrop_farming: String,
}

impl CardRecord {
    /// Minimal record with every enumerated field at its feed default
    pub fn new(id: &str, name: &str, issuer: &str) -> Self {
        CardRecord {
            id: id.to_string(),
            name: name.to_string(),
            issuer: issuer.to_string(),
            card_type: CardType::Debit,
            network: Network::Visa,
            cashback: Cashback::Unspecified("N/A".to_string()),
            cashback_min: String::new(),
            annual_fee: "Free".to_string(),
            fx_fee: "Not specified".to_string(),
            perks: Vec::new(),
            signup_bonus: "None".to_string(),
            custody: Custody::Custodial,
            regions: String::new(),
            official_link: String::new(),
            metal: false,
            supported_assets: String::new(),
            kyc: KycLevel::Required,
            supported_currencies: Vec::new(),
            rank: None,
            age: String::new(),
            airdrop_farming: String::new(),
        }
    }

    pub fn with_cashback(mut self, cashback: Cashback) -> Self {
        self.cashback = cashback;
        self
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub fn with_custody(mut self, custody: Custody) -> Self {
        self.custody = custody;
        self
    }

    pub fn with_kyc(mut self, kyc: KycLevel) -> Self {
        self.kyc = kyc;
        self
    }

    pub fn with_regions(mut self, regions: &str) -> Self {
        self.regions = regions.to_string();
        self
    }

    pub fn with_currencies(mut self, currencies: &[&str]) -> Self {
        self.supported_currencies = currencies.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_perks(mut self, perks: &[&str]) -> Self {
        self.perks = perks.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================
