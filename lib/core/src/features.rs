//! Time-decayed feature aggregation over transactional records.
//!
//! Converts a blotter of dated trades per entity into decayed activity
//! buckets keyed by region/country/feature-kind/pair/product/tenor.
//! Aggregation always recomputes from the full (deduplicated) record log,
//! so re-ingesting the same history is idempotent; incremental upserts
//! would be an optimization, never a semantic difference. Malformed or
//! future-dated records are excluded and surfaced as warnings, and empty
//! buckets are never materialized.

use ahash::{AHashMap, AHashSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::decay::{decayed_amount, recency_score, HALF_LIFE_30D, HALF_LIFE_365D, HALF_LIFE_90D};
use crate::entity::EntityKey;
use crate::signals::{
    normalize_ccy_pair, normalize_country, normalize_product_type, normalize_region,
    normalize_tenor_bucket, parse_notional_m, parse_trade_date,
};

/// Granularity of a feature bucket.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureKind {
    Pair,
    Product,
    Tenor,
    PairProduct,
    PairProductTenor,
}

/// Composite bucket key. Exactly one aggregate row exists per key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey {
    pub entity: EntityKey,
    pub region: String,
    pub country: String,
    pub kind: FeatureKind,
    pub ccy_pair: String,
    pub product_type: String,
    pub tenor_bucket: String,
}

/// A raw blotter row before canonicalization. Field spellings are
/// whatever the upstream system produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawTradeRecord {
    pub entity: EntityKey,
    pub trade_date: String,
    pub region: String,
    pub country: String,
    pub ccy_pair: String,
    pub product_type: String,
    pub tenor_bucket: String,
    pub notional_m: String,
}

/// One materialized feature bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureAggregate {
    pub key: FeatureKey,
    pub trade_count: u64,
    pub hit_notional_sum: f64,
    pub last_activity: NaiveDate,
    pub score_30d: f64,
    pub score_90d: f64,
    pub score_365d: f64,
    pub recency_score: f64,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub aggregates: Vec<FeatureAggregate>,
    pub warnings: Vec<String>,
    pub duplicates_skipped: usize,
}

struct CleanTrade {
    entity: EntityKey,
    date: NaiveDate,
    region: String,
    country: String,
    ccy_pair: String,
    product_type: String,
    tenor_bucket: String,
    notional_m: f64,
}

impl CleanTrade {
    /// Decay weight: notional when present, unit weight otherwise, so
    /// unweighted count records still accumulate activity.
    fn amount(&self) -> f64 {
        if self.notional_m > 0.0 {
            self.notional_m
        } else {
            1.0
        }
    }
}

/// Recompute all feature buckets from the full record log.
pub fn aggregate_trades(records: &[RawTradeRecord], now: NaiveDate) -> AggregationOutcome {
    let mut outcome = AggregationOutcome::default();
    let mut seen: AHashSet<(EntityKey, NaiveDate, String, String, u64)> = AHashSet::new();
    let mut clean: Vec<CleanTrade> = Vec::with_capacity(records.len());

    for record in records {
        let date = match parse_trade_date(&record.trade_date) {
            Some(d) => d,
            None => {
                let msg = format!(
                    "excluding trade for {}: unparseable date {:?}",
                    record.entity, record.trade_date
                );
                warn!("{msg}");
                outcome.warnings.push(msg);
                continue;
            }
        };
        if date > now {
            let msg =
                format!("excluding trade for {}: future-dated {}", record.entity, date);
            warn!("{msg}");
            outcome.warnings.push(msg);
            continue;
        }

        let trade = CleanTrade {
            entity: record.entity,
            date,
            region: normalize_region(&record.region),
            country: normalize_country(&record.country),
            ccy_pair: normalize_ccy_pair(&record.ccy_pair),
            product_type: normalize_product_type(&record.product_type),
            tenor_bucket: normalize_tenor_bucket(&record.tenor_bucket),
            notional_m: parse_notional_m(&record.notional_m),
        };

        let identity = (
            trade.entity,
            trade.date,
            trade.ccy_pair.clone(),
            trade.product_type.clone(),
            trade.notional_m.to_bits(),
        );
        if !seen.insert(identity) {
            outcome.duplicates_skipped += 1;
            continue;
        }
        clean.push(trade);
    }

    let mut buckets: AHashMap<FeatureKey, FeatureAggregate> = AHashMap::new();
    for trade in &clean {
        for key in bucket_keys(trade) {
            let entry = buckets.entry(key.clone()).or_insert_with(|| FeatureAggregate {
                key,
                trade_count: 0,
                hit_notional_sum: 0.0,
                last_activity: trade.date,
                score_30d: 0.0,
                score_90d: 0.0,
                score_365d: 0.0,
                recency_score: 0.0,
            });
            entry.trade_count += 1;
            entry.hit_notional_sum += trade.notional_m;
            entry.last_activity = entry.last_activity.max(trade.date);
            let amount = trade.amount();
            entry.score_30d += decayed_amount(amount, trade.date, now, HALF_LIFE_30D);
            entry.score_90d += decayed_amount(amount, trade.date, now, HALF_LIFE_90D);
            entry.score_365d += decayed_amount(amount, trade.date, now, HALF_LIFE_365D);
        }
    }

    let mut aggregates: Vec<FeatureAggregate> = buckets
        .into_values()
        .map(|mut agg| {
            agg.recency_score = recency_score(agg.last_activity, now);
            agg
        })
        .collect();
    aggregates.sort_by(|a, b| a.key.cmp(&b.key));
    outcome.aggregates = aggregates;
    outcome
}

/// The bucket kinds a trade contributes to; a dimension missing from the
/// record simply skips its kinds, so no empty-key buckets appear.
fn bucket_keys(trade: &CleanTrade) -> Vec<FeatureKey> {
    let base = |kind, pair: &str, product: &str, tenor: &str| FeatureKey {
        entity: trade.entity,
        region: trade.region.clone(),
        country: trade.country.clone(),
        kind,
        ccy_pair: pair.to_string(),
        product_type: product.to_string(),
        tenor_bucket: tenor.to_string(),
    };

    let mut keys = Vec::with_capacity(5);
    let has_pair = !trade.ccy_pair.is_empty();
    let has_product = !trade.product_type.is_empty();
    let has_tenor = !trade.tenor_bucket.is_empty();

    if has_pair {
        keys.push(base(FeatureKind::Pair, &trade.ccy_pair, "", ""));
    }
    if has_product {
        keys.push(base(FeatureKind::Product, "", &trade.product_type, ""));
    }
    if has_tenor {
        keys.push(base(FeatureKind::Tenor, "", "", &trade.tenor_bucket));
    }
    if has_pair && has_product {
        keys.push(base(FeatureKind::PairProduct, &trade.ccy_pair, &trade.product_type, ""));
    }
    if has_pair && has_product && has_tenor {
        keys.push(base(
            FeatureKind::PairProductTenor,
            &trade.ccy_pair,
            &trade.product_type,
            &trade.tenor_bucket,
        ));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKey;

    fn record(date: &str, pair: &str, notional: &str) -> RawTradeRecord {
        RawTradeRecord {
            entity: EntityKey::client(1),
            trade_date: date.to_string(),
            region: "EUROPE".to_string(),
            country: "UK".to_string(),
            ccy_pair: pair.to_string(),
            product_type: "KNO".to_string(),
            tenor_bucket: "1M-3M".to_string(),
            notional_m: notional.to_string(),
        }
    }

    fn now() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn reingesting_the_same_trade_does_not_double_count() {
        let r = record("2024-05-20", "EURGBP", "15.00M");
        let once = aggregate_trades(&[r.clone()], now());
        let twice = aggregate_trades(&[r.clone(), r], now());
        assert_eq!(twice.duplicates_skipped, 1);
        assert_eq!(once.aggregates, twice.aggregates);
        let pair_bucket = twice
            .aggregates
            .iter()
            .find(|a| a.key.kind == FeatureKind::Pair && a.key.ccy_pair == "EURGBP")
            .unwrap();
        assert_eq!(pair_bucket.trade_count, 1);
        assert_eq!(pair_bucket.hit_notional_sum, 15.0);
    }

    #[test]
    fn aggregation_is_idempotent_over_the_full_log() {
        let records = vec![
            record("2024-05-01", "EURUSD", "10M"),
            record("2024-04-01", "EURUSD", "5M"),
            record("2024-05-15", "USDJPY", "7.5M"),
        ];
        let a = aggregate_trades(&records, now());
        let b = aggregate_trades(&records, now());
        assert_eq!(a.aggregates, b.aggregates);
    }

    #[test]
    fn future_and_malformed_dates_are_excluded_with_warnings() {
        let records = vec![
            record("2099-01-01", "EURUSD", "10M"),
            record("garbage", "EURUSD", "10M"),
            record("2024-05-01", "EURUSD", "10M"),
        ];
        let outcome = aggregate_trades(&records, now());
        assert_eq!(outcome.warnings.len(), 2);
        let pair_bucket = outcome
            .aggregates
            .iter()
            .find(|a| a.key.kind == FeatureKind::Pair)
            .unwrap();
        assert_eq!(pair_bucket.trade_count, 1);
    }

    #[test]
    fn zero_record_buckets_are_not_materialized() {
        let outcome = aggregate_trades(&[], now());
        assert!(outcome.aggregates.is_empty());

        // A record with no pair/product/tenor contributes no buckets.
        let bare = RawTradeRecord {
            entity: EntityKey::client(2),
            trade_date: "2024-05-01".to_string(),
            region: "EUROPE".to_string(),
            country: "".to_string(),
            ccy_pair: "".to_string(),
            product_type: "".to_string(),
            tenor_bucket: "".to_string(),
            notional_m: "3M".to_string(),
        };
        let outcome = aggregate_trades(&[bare], now());
        assert!(outcome.aggregates.is_empty());
    }

    #[test]
    fn decayed_scores_follow_half_life_windows() {
        // One 10M trade exactly 30 days old.
        let r = record("2024-05-02", "EURUSD", "10M");
        let outcome = aggregate_trades(&[r], now());
        let bucket = outcome
            .aggregates
            .iter()
            .find(|a| a.key.kind == FeatureKind::PairProductTenor)
            .unwrap();
        assert!((bucket.score_30d - 5.0).abs() < 1e-9);
        assert!(bucket.score_90d > bucket.score_30d);
        assert!(bucket.score_365d > bucket.score_90d);
        // Recency uses the 90-day half-life over the most recent date.
        assert!((bucket.recency_score - (-std::f64::consts::LN_2 * 30.0 / 90.0).exp()).abs() < 1e-9);
    }

    #[test]
    fn unweighted_records_fall_back_to_unit_amount() {
        let r = record("2024-06-01", "EURUSD", "");
        let outcome = aggregate_trades(&[r], now());
        let bucket = outcome.aggregates.iter().find(|a| a.key.kind == FeatureKind::Pair).unwrap();
        assert_eq!(bucket.hit_notional_sum, 0.0);
        assert!((bucket.score_30d - 1.0).abs() < 1e-9);
    }
}
