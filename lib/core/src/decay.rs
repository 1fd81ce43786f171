//! Exponential half-life decay.
//!
//! Pure functions of `(amount, age, half_life)`. "Now" is always injected
//! by the caller so repeated runs over fixed inputs reproduce exactly.

use chrono::NaiveDate;

/// Half-life windows (days) for the decayed activity scores.
pub const HALF_LIFE_30D: f64 = 30.0;
pub const HALF_LIFE_90D: f64 = 90.0;
pub const HALF_LIFE_365D: f64 = 365.0;

/// Default half-life for observation recency in profile composition.
pub const PROFILE_HALF_LIFE_DAYS: f64 = 90.0;

/// Weight of an event `age_days` old under a half-life of
/// `half_life_days`: halves every `half_life_days` days. Negative ages
/// (future dates slipping through) clamp to full weight; callers are
/// expected to have excluded future-dated records already.
pub fn half_life_weight(age_days: i64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 1.0;
    }
    let age = age_days.max(0) as f64;
    (-std::f64::consts::LN_2 * age / half_life_days).exp()
}

/// Decayed contribution of `amount` dated `event_date`, seen from `now`.
pub fn decayed_amount(amount: f64, event_date: NaiveDate, now: NaiveDate, half_life_days: f64) -> f64 {
    amount * half_life_weight((now - event_date).num_days(), half_life_days)
}

/// Freshness of a bucket's most recent activity, independent of volume:
/// `exp(-ln2 * age / 90)`.
pub fn recency_score(last_activity: NaiveDate, now: NaiveDate) -> f64 {
    half_life_weight((now - last_activity).num_days(), HALF_LIFE_90D)
}
