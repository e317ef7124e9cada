//! Rule evaluation against the event stream.
//!
//! Per event:
//! 1. No baseline for the product on this stream: seed it, no alerts.
//! 2. Each large-order rule with `size >= min_size` fires (rule order).
//! 3. Each deviation rule with `price / baseline >= min_ratio` fires
//!    (rule order). Checked as `price >= baseline * min_ratio`.
//!
//! There is no dedup or cooldown: a sustained move fires on every
//! qualifying event.

use crate::alert::{AlertKind, AlertOccurrence};
use crate::baseline::BaselineTracker;
use crate::rule::Rule;
use coinwatch_feed::{EventKind, MarketEvent};
use tracing::{debug, warn};

/// Evaluate one event against `rules` with an explicit baseline tracker.
///
/// Deterministic given `(event, rules, tracker state)`.
pub fn evaluate_with(
    event: &MarketEvent,
    rules: &[Rule],
    baselines: &mut BaselineTracker,
) -> Vec<AlertOccurrence> {
    if !event.is_valid() {
        warn!(
            product_id = %event.product_id(),
            price = %event.price(),
            size = %event.size(),
            "Skipping event with negative values"
        );
        return Vec::new();
    }

    let product_id = event.product_id();
    let Some(reference) = baselines.get(product_id) else {
        baselines.observe(product_id, event.price());
        debug!(%product_id, kind = event.kind().as_str(), "First event for product, no alerts");
        return Vec::new();
    };

    let mut alerts = Vec::new();

    for rule in rules {
        if let Rule::LargeOrder { min_size } = rule {
            if event.size().meets(*min_size) {
                alerts.push(AlertOccurrence {
                    kind: AlertKind::LargeOrder,
                    product_id: product_id.clone(),
                    side: Some(event.side()),
                    amount: event.size().inner(),
                    reference_value: min_size.inner(),
                    threshold: min_size.inner(),
                    timestamp: event.timestamp().map(str::to_string),
                    source: event.kind(),
                });
            }
        }
    }

    for rule in rules {
        if let Rule::PriceDeviation { min_ratio } = rule {
            if event.price().reaches_ratio(reference, *min_ratio) {
                alerts.push(AlertOccurrence {
                    kind: AlertKind::PriceDeviation,
                    product_id: product_id.clone(),
                    side: None,
                    amount: event.price().inner(),
                    reference_value: reference.inner(),
                    threshold: *min_ratio,
                    timestamp: event.timestamp().map(str::to_string),
                    source: event.kind(),
                });
            }
        }
    }

    alerts
}

/// Owns the rule set and one baseline tracker per event stream.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    rules: Vec<Rule>,
    ticker_baselines: BaselineTracker,
    book_baselines: BaselineTracker,
}

impl RuleEvaluator {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            ticker_baselines: BaselineTracker::new(),
            book_baselines: BaselineTracker::new(),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&mut self, event: &MarketEvent) -> Vec<AlertOccurrence> {
        let baselines = match event.kind() {
            EventKind::Ticker => &mut self.ticker_baselines,
            EventKind::Book => &mut self.book_baselines,
        };
        evaluate_with(event, &self.rules, baselines)
    }

    pub fn baselines(&self, kind: EventKind) -> &BaselineTracker {
        match kind {
            EventKind::Ticker => &self.ticker_baselines,
            EventKind::Book => &self.book_baselines,
        }
    }

    /// Drop all baselines; the next event per product reseeds.
    pub fn reset(&mut self) {
        self.ticker_baselines.clear();
        self.book_baselines.clear();
    }
}
