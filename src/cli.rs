// 🖥️ CLI helpers - flag parsing and plain-text output for the `card-radar` binary

use crate::card::CardRecord;
use crate::compare::{Comparison, MAX_COMPARE_CARDS};
use crate::view::ViewRequest;
use anyhow::{bail, Result};

pub const USAGE: &str = "\
Usage: card-radar <command> [args]

Commands:
  import                 Fetch the feed and store a snapshot in the database
  list [flags]           Print the filtered, sorted card list
  show <id>              Print every field of one card
  compare <id> <id>...   Side-by-side comparison
  history [digest]       Recent snapshots and fetch events, or the fetches of one snapshot

List flags:
  --search <text>        Name, issuer or perk contains text
  --type <list>          Credit,Debit,Prepaid
  --network <list>       Visa,Mastercard,Visa/Mastercard
  --custody <list>       Custodial,Self-Custody,Non-Custodial,Hybrid
  --min-cashback <pct>   Minimum numeric cashback
  --region <name>        Country or region, e.g. India
  --kyc <level>          Required, Light, None or Any
  --currency <code>      e.g. USD
  --sort <option>        featured (default), cashback, name, newest
";

/// Turn `--flag value` pairs into a view request
pub fn parse_list_args(args: &[String]) -> Result<ViewRequest> {
    let mut request = ViewRequest::default();
    let mut iter = args.iter();

    while let Some(flag) = iter.next() {
        let Some(value) = iter.next() else {
            bail!("Missing value for {}", flag);
        };
        let value = Some(value.clone());

        match flag.as_str() {
            "--search" => request.search = value,
            "--type" => request.card_type = value,
            "--network" => request.network = value,
            "--custody" => request.custody = value,
            "--min-cashback" => request.min_cashback = value,
            "--region" => request.region = value,
            "--kyc" => request.kyc = value,
            "--currency" => request.currency = value,
            "--sort" => request.sort = value,
            other => bail!("Unknown flag {}\n\n{}", other, USAGE),
        }
    }

    Ok(request)
}

/// One line per card: name, issuer, network, cashback, custody, KYC
pub fn format_card_line(card: &CardRecord) -> String {
    format!(
        "{:<24} {:<14} {:<16} {:>9}  {:<14} {}",
        truncate(&card.name, 24),
        truncate(&card.issuer, 14),
        card.network.name(),
        card.cashback.to_string(),
        card.custody.name(),
        card.kyc.name(),
    )
}

pub fn format_card_details(card: &CardRecord) -> String {
    let mut lines = vec![
        format!("{} ({})", card.name, card.id),
        format!("  Issuer:      {}", card.issuer),
        format!("  Type:        {}", card.card_type.name()),
        format!("  Network:     {}", card.network.name()),
        format!("  Cashback:    {}", card.cashback),
        format!("  Annual fee:  {}", card.annual_fee),
        format!("  FX fee:      {}", card.fx_fee),
        format!("  Custody:     {}", card.custody.name()),
        format!("  KYC:         {}", card.kyc.name()),
        format!("  Regions:     {}", card.regions),
        format!("  Currencies:  {}", card.supported_currencies.join(", ")),
        format!("  Metal:       {}", if card.metal { "Yes" } else { "No" }),
    ];

    if let Some(rank) = card.rank {
        lines.push(format!("  Rank:        {}", rank));
    }
    if !card.official_link.is_empty() {
        lines.push(format!("  Link:        {}", card.official_link));
    }
    if !card.perks.is_empty() {
        lines.push("  Perks:".to_string());
        lines.extend(card.perks.iter().map(|perk| format!("    - {}", perk)));
    }

    lines.join("\n")
}

pub fn format_comparison(comparison: &Comparison) -> String {
    let mut lines = Vec::new();

    let header: Vec<String> = comparison
        .card_names
        .iter()
        .map(|name| format!("{:<22}", truncate(name, 22)))
        .collect();
    lines.push(format!("{:<12} {}", "", header.join(" ")));

    for row in &comparison.rows {
        let cells: Vec<String> = row
            .values
            .iter()
            .map(|value| format!("{:<22}", truncate(value, 22)))
            .collect();
        lines.push(format!("{:<12} {}", row.label, cells.join(" ")));
    }

    if !comparison.missing.is_empty() {
        lines.push(format!("Not found: {}", comparison.missing.join(", ")));
    }
    if !comparison.over_limit.is_empty() {
        lines.push(format!(
            "Only {} cards fit side by side, left out: {}",
            MAX_COMPARE_CARDS,
            comparison.over_limit.join(", ")
        ));
    }

    lines.join("\n")
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
