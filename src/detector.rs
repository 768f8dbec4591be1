//! Compares each observation against the last committed snapshot and turns
//! differences into typed change events.

use rust_decimal::Decimal;
use tracing::debug;

use crate::config::AlertPolicy;
use crate::models::{ChangeEvent, ChangeKind, ProductRecord};
use crate::snapshot::SnapshotStore;

pub struct ChangeDetector {
    policy: AlertPolicy,
}

impl ChangeDetector {
    pub fn new(policy: AlertPolicy) -> Self {
        ChangeDetector { policy }
    }

    /// Diff a whole run against the baseline. The store must not have been
    /// committed with this run yet.
    pub fn detect_run(&self, store: &SnapshotStore, records: &[ProductRecord]) -> Vec<ChangeEvent> {
        let mut events = Vec::new();
        for record in records {
            events.extend(self.detect(store.latest(&record.url), record));
        }
        events
    }

    /// Diff one observation against its previous snapshot.
    ///
    /// A URL seen for the first time yields exactly one `NewProduct` event
    /// and nothing else. A failed observation yields at most an
    /// `ExtractionFailed` transition; its unknown fields are never read as
    /// real changes.
    pub fn detect(
        &self,
        previous: Option<&ProductRecord>,
        current: &ProductRecord,
    ) -> Vec<ChangeEvent> {
        let Some(previous) = previous else {
            return vec![ChangeEvent::new(&current.url, ChangeKind::NewProduct)
                .with_values(None, current.price.map(|p| p.to_string()))];
        };

        if !current.success {
            if previous.success {
                return vec![ChangeEvent::new(&current.url, ChangeKind::ExtractionFailed)
                    .with_values(
                        None,
                        current.error_kind.map(|k| k.to_string()),
                    )];
            }
            return Vec::new();
        }

        let mut events = Vec::new();

        if let (Some(old_price), Some(new_price)) =
            (previous.comparable_price(), current.comparable_price())
        {
            if old_price != new_price {
                // The threshold compares the exact delta; rounding is for
                // display only, so 4.996% cannot round up into a 5% alert.
                let delta = (new_price - old_price) / old_price * Decimal::from(100);
                if delta.abs() >= self.policy.price_threshold_percent {
                    let kind = if delta > Decimal::ZERO {
                        ChangeKind::PriceIncrease
                    } else {
                        ChangeKind::PriceDecrease
                    };
                    events.push(
                        ChangeEvent::new(&current.url, kind)
                            .with_values(
                                Some(old_price.to_string()),
                                Some(new_price.to_string()),
                            )
                            .with_delta(delta.round_dp(2)),
                    );
                } else {
                    debug!(url = %current.url, %delta, "price moved below alert threshold");
                }
            }
        }

        if previous.availability != current.availability {
            events.push(
                ChangeEvent::new(&current.url, ChangeKind::AvailabilityChanged).with_values(
                    Some(previous.availability.to_string()),
                    Some(current.availability.to_string()),
                ),
            );
        }

        events
    }
}
