//! Merged case timeline

use crate::{CollectionOutcome, Source, TimelineEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Time-ordered view of a case across every registered source.
///
/// Built fresh by [`Timeline::merge`] on every aggregation run and never
/// patched afterwards. Contains no wall-clock data of its own, so identical
/// upstream data always serializes to identical bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
    pub degraded: bool,
    pub missing_sources: BTreeSet<Source>,
}

impl Timeline {
    /// Merge per-source outcomes into a timeline.
    ///
    /// Events are ordered by `occurredAt`, then source precedence, then the
    /// order the source emitted them. Any non-success outcome marks the
    /// timeline degraded and lists the source as missing.
    pub fn merge(outcomes: BTreeMap<Source, CollectionOutcome>) -> Self {
        let mut events = Vec::new();
        let mut missing_sources = BTreeSet::new();

        // BTreeMap iterates in source precedence order; the stable sort below
        // then keeps emission order for equal (occurredAt, source) keys.
        for (source, outcome) in outcomes {
            match outcome {
                CollectionOutcome::Success(batch) => events.extend(batch),
                _ => {
                    missing_sources.insert(source);
                }
            }
        }

        events.sort_by(|a, b| {
            a.occurred_at
                .cmp(&b.occurred_at)
                .then_with(|| a.source.cmp(&b.source))
        });

        Self {
            events,
            degraded: !missing_sources.is_empty(),
            missing_sources,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn ev(source: Source, secs: i64, kind: &str) -> TimelineEvent {
        TimelineEvent::new(source, at(secs), kind)
    }

    #[test]
    fn test_merge_orders_by_time_then_source() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            Source::Order,
            CollectionOutcome::Success(vec![ev(Source::Order, 2, "placed")]),
        );
        outcomes.insert(
            Source::Payment,
            CollectionOutcome::Success(vec![ev(Source::Payment, 1, "authorized")]),
        );
        outcomes.insert(
            Source::Fulfillment,
            CollectionOutcome::Success(vec![ev(Source::Fulfillment, 1, "packed")]),
        );

        let timeline = Timeline::merge(outcomes);
        let order: Vec<(Source, &str)> = timeline
            .events
            .iter()
            .map(|e| (e.source, e.kind.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (Source::Payment, "authorized"),
                (Source::Fulfillment, "packed"),
                (Source::Order, "placed"),
            ]
        );
        assert!(!timeline.degraded);
        assert!(timeline.missing_sources.is_empty());
    }

    #[test]
    fn test_merge_keeps_emission_order_for_ties() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            Source::Order,
            CollectionOutcome::Success(vec![
                ev(Source::Order, 5, "second-emitted-first"),
                ev(Source::Order, 5, "emitted-second"),
                ev(Source::Order, 1, "earliest"),
            ]),
        );
        let timeline = Timeline::merge(outcomes);
        let kinds: Vec<&str> = timeline.events.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["earliest", "second-emitted-first", "emitted-second"]);
    }

    #[test]
    fn test_merge_marks_failures_missing() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            Source::Order,
            CollectionOutcome::Success(vec![ev(Source::Order, 1, "placed")]),
        );
        outcomes.insert(Source::Payment, CollectionOutcome::DecodeError);
        outcomes.insert(Source::Fulfillment, CollectionOutcome::Timeout);

        let timeline = Timeline::merge(outcomes);
        assert_eq!(timeline.events.len(), 1);
        assert!(timeline.degraded);
        assert_eq!(
            timeline.missing_sources.into_iter().collect::<Vec<_>>(),
            vec![Source::Payment, Source::Fulfillment]
        );
    }

    #[test]
    fn test_merge_all_failed_is_empty_and_degraded() {
        let outcomes = Source::ALL
            .into_iter()
            .map(|s| (s, CollectionOutcome::UpstreamError { status: Some(500) }))
            .collect();
        let timeline = Timeline::merge(outcomes);
        assert!(timeline.is_empty());
        assert!(timeline.degraded);
        assert_eq!(timeline.missing_sources.len(), 3);
    }

    #[test]
    fn test_wire_field_names() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert(Source::Fulfillment, CollectionOutcome::Timeout);
        let json = serde_json::to_value(Timeline::merge(outcomes)).unwrap();
        assert_eq!(json["degraded"], true);
        assert_eq!(json["missingSources"][0], "FULFILLMENT");
        assert!(json["events"].as_array().unwrap().is_empty());
    }

    fn arb_source() -> impl Strategy<Value = Source> {
        prop_oneof![
            Just(Source::Order),
            Just(Source::Payment),
            Just(Source::Fulfillment)
        ]
    }

    proptest! {
        #[test]
        fn prop_merge_is_sorted_and_lossless(
            raw in prop::collection::vec((arb_source(), 0i64..20), 0..40)
        ) {
            let mut outcomes: BTreeMap<Source, CollectionOutcome> = BTreeMap::new();
            for (idx, (source, secs)) in raw.iter().enumerate() {
                let event = ev(*source, *secs, &idx.to_string());
                match outcomes
                    .entry(*source)
                    .or_insert_with(|| CollectionOutcome::Success(Vec::new()))
                {
                    CollectionOutcome::Success(batch) => batch.push(event),
                    _ => unreachable!(),
                }
            }

            let timeline = Timeline::merge(outcomes);
            prop_assert_eq!(timeline.events.len(), raw.len());
            for pair in timeline.events.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert!((a.occurred_at, a.source) <= (b.occurred_at, b.source));
                if a.occurred_at == b.occurred_at && a.source == b.source {
                    // kind carries the emission index
                    let ia: usize = a.kind.parse().unwrap();
                    let ib: usize = b.kind.parse().unwrap();
                    prop_assert!(ia < ib);
                }
            }
        }

        #[test]
        fn prop_merge_is_deterministic(
            raw in prop::collection::vec((arb_source(), 0i64..5), 0..20)
        ) {
            let build = || {
                let mut outcomes: BTreeMap<Source, CollectionOutcome> = BTreeMap::new();
                for (idx, (source, secs)) in raw.iter().enumerate() {
                    if let CollectionOutcome::Success(batch) = outcomes
                        .entry(*source)
                        .or_insert_with(|| CollectionOutcome::Success(Vec::new()))
                    {
                        batch.push(ev(*source, *secs, &format!("k{idx}")));
                    }
                }
                serde_json::to_vec(&Timeline::merge(outcomes)).unwrap()
            };
            prop_assert_eq!(build(), build());
        }
    }
}
