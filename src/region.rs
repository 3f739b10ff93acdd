// 🌍 Region Alias Matcher
// A country selection also matches cards sold in its broader geography

/// Selection that matches every card
pub const GLOBAL_REGION: &str = "Global";

/// Lowercase region name → broader-geography keywords it also matches
pub const REGION_ALIASES: &[(&str, &[&str])] = &[
    ("india", &["apac", "asia", "global", "worldwide"]),
    ("nigeria", &["africa", "global", "worldwide"]),
    ("japan", &["apac", "asia", "global", "worldwide"]),
    ("singapore", &["apac", "asia", "global", "worldwide"]),
    ("australia", &["apac", "oceania", "global", "worldwide"]),
    ("brazil", &["latam", "south america", "global", "worldwide"]),
    ("argentina", &["latam", "south america", "global", "worldwide"]),
    ("mexico", &["latam", "north america", "global", "worldwide"]),
    ("canada", &["north america", "global", "worldwide"]),
    ("united kingdom", &["uk", "europe", "global", "worldwide"]),
    ("germany", &["eea", "europe", "global", "worldwide"]),
    ("france", &["eea", "europe", "global", "worldwide"]),
    ("uae", &["mena", "global", "worldwide"]),
    ("united states", &["us", "usa"]),
    ("usa", &["us", "usa"]),
];

/// Alias keywords for a region, empty when the region has none
fn aliases_for(region: &str) -> &'static [&'static str] {
    let key = region.to_lowercase();

    REGION_ALIASES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[])
}

/// Does a card's free-text region list cover the selected region?
///
/// An empty selection or exactly `"Global"` matches everything. Otherwise the
/// selection, or one of its aliases, must appear in the card's region text
/// (case-insensitive substring).
pub fn matches_region(card_regions: &str, selected: &str) -> bool {
    if selected.is_empty() || selected == GLOBAL_REGION {
        return true;
    }

    let regions = card_regions.to_lowercase();
    let selected = selected.to_lowercase();

    if regions.contains(&selected) {
        return true;
    }

    aliases_for(&selected)
        .iter()
        .any(|alias| regions.contains(alias))
}

/// Region names that carry an alias table, in table order
pub fn known_regions() -> Vec<&'static str> {
    REGION_ALIASES.iter().map(|(name, _)| *name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_global_selection_match_everything() {
        assert!(matches_region("", ""));
        assert!(matches_region("EEA only", ""));
        assert!(matches_region("US", GLOBAL_REGION));
    }

    #[test]
    fn test_literal_substring_match() {
        assert!(matches_region("Europe, UK, EEA", "Europe"));
        assert!(matches_region("Europe, UK, EEA", "europe"));
        assert!(matches_region("Brazil, Mexico", "BRAZIL"));
    }

    #[test]
    fn test_india_matches_asia_via_alias() {
        assert!(matches_region("Asia, Global", "India"));
        assert!(matches_region("APAC", "india"));
        assert!(!matches_region("Europe, EEA", "India"));
    }

    #[test]
    fn test_unknown_region_has_no_aliases() {
        assert!(aliases_for("Atlantis").is_empty());
        assert!(!matches_region("Global, Worldwide", "Atlantis"));
    }

    #[test]
    fn test_aliases_for_is_case_insensitive() {
        assert_eq!(aliases_for("United Kingdom"), &["uk", "europe", "global", "worldwide"]);
        assert_eq!(aliases_for("USA"), &["us", "usa"]);
    }

    #[test]
    fn test_lowercase_global_is_a_plain_selection() {
        assert!(matches_region("Global", "global"));
        assert!(!matches_region("Europe", "global"));
    }

    #[test]
    fn test_known_regions() {
        let regions = known_regions();
        assert_eq!(regions.len(), REGION_ALIASES.len());
        assert_eq!(regions[0], "india");
    }
}
