//! Property tests for pattern canonicalization, merge uniqueness, and the
//! diff/apply round-trip.

use chrono::Utc;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

use pagecap::domain::models::CachedPage;
use pagecap::services::capability_cache::{apply_diff_to, compute_diff};
use pagecap::services::content_hash::{tool_hash, tools_hash};
use pagecap::services::merge_engine::dedup_by_name;
use pagecap::services::url_pattern::to_pattern;
use pagecap::{Capability, Category, MergeEngine, ToolSource};

const NAMES: &[&str] = &[
    "search.q",
    "nav.home",
    "nav.deals",
    "form.contact",
    "media.play",
    "social.like",
];

fn arb_tool(source: ToolSource) -> impl Strategy<Value = Capability> {
    (0..NAMES.len(), 0u8..=100, prop::sample::select(vec![Category::Search, Category::Form]))
        .prop_map(move |(i, pct, category)| {
            Capability::new(NAMES[i], category, source, f64::from(pct) / 100.0)
                .with_description(format!("{} at {pct}", NAMES[i]))
        })
}

fn arb_tools(source: ToolSource) -> impl Strategy<Value = Vec<Capability>> {
    prop::collection::vec(arb_tool(source), 0..8)
}

fn fingerprint(tools: &[Capability]) -> BTreeSet<(String, String)> {
    tools.iter().map(|t| (t.name.clone(), tool_hash(t))).collect()
}

fn cached(tools: Vec<Capability>) -> CachedPage {
    CachedPage {
        pattern: "/".into(),
        hash: tools_hash(&tools),
        tools,
        scanned_at: Utc::now(),
    }
}

proptest! {
    /// Property: merged output never repeats a name, never keeps a tool
    /// below the threshold, and is sorted by (category, name).
    #[test]
    fn prop_merge_unique_filtered_sorted(
        native in arb_tools(ToolSource::Native),
        declarative in arb_tools(ToolSource::Declarative),
        inferred in arb_tools(ToolSource::Inferred),
        threshold in 0u8..=100,
    ) {
        let engine = MergeEngine::new(f64::from(threshold) / 100.0);
        let merged = engine.merge(native, declarative, inferred);

        let names: HashSet<&str> = merged.iter().map(|t| t.name.as_str()).collect();
        prop_assert_eq!(names.len(), merged.len());
        prop_assert!(merged.iter().all(|t| t.confidence >= engine.min_confidence()));
        prop_assert!(merged
            .windows(2)
            .all(|w| (w[0].category, &w[0].name) <= (w[1].category, &w[1].name)));
    }

    /// Property: a surviving name declared natively is always the native
    /// entry, whatever the other tiers' confidence.
    #[test]
    fn prop_native_always_wins(
        native in arb_tools(ToolSource::Native),
        declarative in arb_tools(ToolSource::Declarative),
        inferred in arb_tools(ToolSource::Inferred),
    ) {
        let native_names: HashSet<String> = native.iter().map(|t| t.name.clone()).collect();
        let merged = MergeEngine::new(0.0).merge(native, declarative, inferred);

        for tool in &merged {
            if native_names.contains(&tool.name) {
                prop_assert_eq!(tool.source, ToolSource::Native);
            }
        }
        prop_assert!(native_names.iter().all(|n| merged.iter().any(|t| &t.name == n)));
    }

    /// Property: merging the same inputs twice gives the same result.
    #[test]
    fn prop_merge_deterministic(
        declarative in arb_tools(ToolSource::Declarative),
        inferred in arb_tools(ToolSource::Inferred),
    ) {
        let engine = MergeEngine::default();
        let first = engine.merge(Vec::new(), declarative.clone(), inferred.clone());
        let second = engine.merge(Vec::new(), declarative, inferred);
        prop_assert_eq!(fingerprint(&first), fingerprint(&second));
        let order = |tools: &[Capability]| tools.iter().map(|t| t.name.clone()).collect::<Vec<_>>();
        prop_assert_eq!(order(&first), order(&second));
    }

    /// Property: query values and key order never affect the pattern.
    #[test]
    fn prop_pattern_ignores_values_and_key_order(
        segments in prop::collection::vec("[a-z0-9]{1,8}", 0..4),
        query in prop::collection::btree_map("[a-z]{1,6}", ("[a-z0-9]{0,6}", "[a-z0-9]{0,6}"), 0..5),
        trailing_slash in any::<bool>(),
    ) {
        let mut path = format!("/{}", segments.join("/"));
        if trailing_slash && !segments.is_empty() {
            path.push('/');
        }
        let forward: Vec<String> = query.iter().map(|(k, (a, _))| format!("{k}={a}")).collect();
        let backward: Vec<String> = query.iter().rev().map(|(k, (_, b))| format!("{k}={b}")).collect();
        let url_a = format!("https://x.test{path}?{}", forward.join("&"));
        let url_b = format!("https://x.test{path}?{}", backward.join("&"));

        let pattern = to_pattern(&url_a);
        prop_assert_eq!(&pattern, &to_pattern(&url_b));
        prop_assert!(pattern.starts_with('/'));
        prop_assert!(pattern.len() == 1 || !pattern.split('?').next().unwrap_or_default().ends_with('/'));

        // A pattern is a fixed point.
        prop_assert_eq!(to_pattern(&format!("https://x.test{pattern}")), pattern.clone());

        for key in query.keys() {
            let needle = format!("{key}=*");
            prop_assert!(pattern.contains(&needle));
        }
    }

    /// Property: applying diff(S, L) to S is equivalent to storing L.
    #[test]
    fn prop_diff_apply_round_trip(
        cached_tools in arb_tools(ToolSource::Inferred),
        live in arb_tools(ToolSource::Inferred),
        has_cache in any::<bool>(),
    ) {
        let cached_tools = dedup_by_name(cached_tools);
        let live = dedup_by_name(live);

        let (base, diff) = if has_cache {
            let page = cached(cached_tools.clone());
            (cached_tools, compute_diff(Some(&page), &live))
        } else {
            (Vec::new(), compute_diff(None, &live))
        };

        let applied = apply_diff_to(base, &diff);
        prop_assert_eq!(fingerprint(&applied), fingerprint(&live));
        prop_assert_eq!(tools_hash(&applied), tools_hash(&live));
        prop_assert_eq!(
            diff.added.len() + diff.changed.len() + diff.unchanged,
            live.len()
        );
    }
}

#[test]
fn test_invalid_url_is_its_own_pattern() {
    assert_eq!(to_pattern("not a url"), "not a url");
    assert_eq!(to_pattern(""), "");
}
