//! Feature Builder: turns order records into model input rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;

use crate::model::FeatureRow;
use crate::store::OrderRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingDeliveryDate,
    UnparseableDeliveryDate,
}

/// An order left out of the feature matrix, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedOrder {
    pub order_id: String,
    pub reason: SkipReason,
}

/// Feature matrix plus the per-row data that travels with it. All vectors are
/// parallel to `rows`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub rows: Vec<FeatureRow>,
    pub order_ids: Vec<String>,
    pub workforce: Vec<i64>,
    /// Heuristic urgency, informational only.
    pub tiers: Vec<u8>,
}

impl FeatureSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureOutcome {
    /// There were no orders at all.
    NoOrders,
    /// Orders existed but every one was skipped.
    AllSkipped(Vec<SkippedOrder>),
    /// At least one usable row.
    Ready {
        features: FeatureSet,
        skipped: Vec<SkippedOrder>,
    },
}

/// 3 when due within a day (or overdue), 2 within three days, else 1.
pub fn urgency_tier(days_left: i64) -> u8 {
    if days_left <= 1 {
        3
    } else if days_left <= 3 {
        2
    } else {
        1
    }
}

/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ts| ts.date())
}

/// Builds the feature matrix `[days_left, quantity, workforce]` in input
/// order. Orders without a usable delivery date are skipped and reported.
pub fn build_features(orders: &[OrderRecord], today: NaiveDate) -> FeatureOutcome {
    if orders.is_empty() {
        return FeatureOutcome::NoOrders;
    }

    let mut features = FeatureSet::default();
    let mut skipped = Vec::new();

    for order in orders {
        let Some(raw) = order.delivery_date.as_deref() else {
            warn!(order_id = %order.id, "skipping order without delivery date");
            skipped.push(SkippedOrder {
                order_id: order.id.clone(),
                reason: SkipReason::MissingDeliveryDate,
            });
            continue;
        };
        let Some(delivery) = parse_delivery_date(raw) else {
            warn!(
                order_id = %order.id,
                delivery_date = raw,
                "skipping order with unparseable delivery date"
            );
            skipped.push(SkippedOrder {
                order_id: order.id.clone(),
                reason: SkipReason::UnparseableDeliveryDate,
            });
            continue;
        };

        let days_left = (delivery - today).num_days();
        features.rows.push(FeatureRow::new(
            days_left as f64,
            order.quantity as f64,
            order.workforce as f64,
        ));
        features.order_ids.push(order.id.clone());
        features.workforce.push(order.workforce);
        features.tiers.push(urgency_tier(days_left));
    }

    if features.is_empty() {
        FeatureOutcome::AllSkipped(skipped)
    } else {
        FeatureOutcome::Ready { features, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn tiers() {
        assert_eq!(urgency_tier(-4), 3);
        assert_eq!(urgency_tier(1), 3);
        assert_eq!(urgency_tier(2), 2);
        assert_eq!(urgency_tier(3), 2);
        assert_eq!(urgency_tier(4), 1);
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 20);
        assert_eq!(parse_delivery_date("2026-10-20"), expected);
        assert_eq!(parse_delivery_date("2026-10-20T08:30:00Z"), expected);
        assert_eq!(parse_delivery_date("2026-10-20T08:30:00+02:00"), expected);
        assert_eq!(parse_delivery_date("2026-10-20T08:30:00"), expected);
        assert_eq!(parse_delivery_date("20/10/2026"), None);
    }

    #[test]
    fn rows_follow_input_order_and_skip_missing_dates() {
        let orders = vec![
            OrderRecord::new("O1", Some("2026-10-19"), 5, 2),
            OrderRecord::new("O2", None, 8, 1),
            OrderRecord::new("O3", Some("2026-10-15"), 3, 4),
            OrderRecord::new("O4", Some("soon"), 3, 4),
        ];

        let FeatureOutcome::Ready { features, skipped } = build_features(&orders, today()) else {
            panic!("expected usable rows");
        };

        assert_eq!(features.order_ids, vec!["O1", "O3"]);
        assert_eq!(features.rows.len(), features.order_ids.len());
        assert_eq!(features.rows[0], FeatureRow::new(1.0, 5.0, 2.0));
        assert_eq!(features.rows[1], FeatureRow::new(-3.0, 3.0, 4.0));
        assert_eq!(features.workforce, vec![2, 4]);
        assert_eq!(features.tiers, vec![3, 3]);
        assert_eq!(
            skipped,
            vec![
                SkippedOrder {
                    order_id: "O2".to_string(),
                    reason: SkipReason::MissingDeliveryDate,
                },
                SkippedOrder {
                    order_id: "O4".to_string(),
                    reason: SkipReason::UnparseableDeliveryDate,
                },
            ]
        );
    }

    #[test]
    fn no_orders_differs_from_all_skipped() {
        assert_eq!(build_features(&[], today()), FeatureOutcome::NoOrders);

        let orders = vec![OrderRecord::new("O1", None, 1, 2)];
        match build_features(&orders, today()) {
            FeatureOutcome::AllSkipped(skipped) => assert_eq!(skipped.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
