// Property tests for the filter/sort engine and region matcher

use card_radar::{
    apply_view, matches_region, CardRecord, Cashback, Custody, FilterConfig, KycLevel, Network,
    SortOption,
};
use proptest::prelude::*;

const REGION_TEXTS: &[&str] = &["", "Global", "Europe, UK", "APAC", "US only", "LATAM", "Asia, Global"];
const SORTS: &[SortOption] = &[
    SortOption::Featured,
    SortOption::CashbackDescending,
    SortOption::NameAscending,
    SortOption::Newest,
];

fn cashback_strategy() -> impl Strategy<Value = Cashback> {
    prop_oneof![
        (0u32..200).prop_map(|tenths| Cashback::Numeric(tenths as f64 / 10.0)),
        Just(Cashback::Unspecified("Up to 8%".to_string())),
        Just(Cashback::Unspecified(String::new())),
    ]
}

fn card_strategy() -> impl Strategy<Value = CardRecord> {
    (
        "[A-Za-z ]{0,12}",
        cashback_strategy(),
        prop::sample::select(REGION_TEXTS),
        prop::sample::select(vec![Network::Visa, Network::Mastercard, Network::VisaMastercard]),
        prop::sample::select(vec![Custody::Custodial, Custody::SelfCustody, Custody::Hybrid]),
        prop::sample::select(vec![KycLevel::Required, KycLevel::Light, KycLevel::None]),
        prop::option::of(1u32..20),
    )
        .prop_map(|(name, cashback, regions, network, custody, kyc, rank)| {
            let mut card = CardRecord::new("", &name, "Issuer")
                .with_cashback(cashback)
                .with_regions(regions)
                .with_network(network)
                .with_custody(custody)
                .with_kyc(kyc);
            card.rank = rank;
            card
        })
}

/// Cards with unique ids, as the parser guarantees
fn cards_strategy() -> impl Strategy<Value = Vec<CardRecord>> {
    prop::collection::vec(card_strategy(), 0..16).prop_map(|cards| {
        cards
            .into_iter()
            .enumerate()
            .map(|(i, mut card)| {
                card.id = format!("card-{}", i);
                card
            })
            .collect()
    })
}

fn ids(cards: &[CardRecord]) -> Vec<String> {
    let mut ids: Vec<String> = cards.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids
}

proptest! {
    #[test]
    fn test_empty_config_keeps_every_card(
        cards in cards_strategy(),
        sort in prop::sample::select(SORTS),
    ) {
        let view = apply_view(&cards, &FilterConfig::default(), sort);
        prop_assert_eq!(ids(&view), ids(&cards));
    }

    #[test]
    fn test_view_is_a_subset(
        cards in cards_strategy(),
        search in "[a-z]{0,3}",
        min_cashback in 0.0f64..20.0,
    ) {
        let filters = FilterConfig { search, min_cashback, ..Default::default() };
        let all = ids(&cards);

        for id in ids(&apply_view(&cards, &filters, SortOption::Featured)) {
            prop_assert!(all.contains(&id));
        }
    }

    #[test]
    fn test_raising_min_cashback_never_adds_cards(
        cards in cards_strategy(),
        low in 0.0f64..20.0,
        extra in 0.0f64..20.0,
    ) {
        let at = |min_cashback: f64| {
            let filters = FilterConfig { min_cashback, ..Default::default() };
            ids(&apply_view(&cards, &filters, SortOption::Newest))
        };

        let wide = at(low);
        for id in at(low + extra) {
            prop_assert!(wide.contains(&id));
        }
    }

    #[test]
    fn test_region_matches_itself(region in "[A-Za-z][A-Za-z ]{0,15}") {
        prop_assert!(matches_region(&region, &region));
        prop_assert!(matches_region(&region.to_uppercase(), &region));
    }

    #[test]
    fn test_sorting_is_idempotent(
        cards in cards_strategy(),
        sort in prop::sample::select(SORTS),
    ) {
        let once = apply_view(&cards, &FilterConfig::default(), sort);
        let twice = apply_view(&once, &FilterConfig::default(), sort);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_newest_keeps_feed_order(cards in cards_strategy()) {
        let view = apply_view(&cards, &FilterConfig::default(), SortOption::Newest);
        prop_assert_eq!(view, cards);
    }
}
