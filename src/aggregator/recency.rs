//! Age-bucket recency weights.
//!
//! A class-playlist occurrence is weighted by its age in whole days:
//!
//! | age (days) | weight |
//! |------------|--------|
//! | < 7        | 10     |
//! | < 30       | 5      |
//! | < 90       | 2      |
//! | < 180      | 1      |
//! | otherwise  | 0      |

use chrono::{DateTime, Utc};

/// Upper bound (exclusive, in days) and weight of each bucket, youngest first.
pub const RECENCY_BUCKETS: [(i64, u32); 4] = [(7, 10), (30, 5), (90, 2), (180, 1)];

/// Weight of an occurrence added at `added_at`, measured from `now`.
///
/// Entries stamped in the future count as brand new.
pub fn recency_weight(added_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let age_days = (now - added_at).num_days();
    RECENCY_BUCKETS
        .iter()
        .find(|(limit, _)| age_days < *limit)
        .map(|(_, weight)| *weight)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn weight_for(days: i64) -> u32 {
        let now = Utc::now();
        recency_weight(now - Duration::days(days), now)
    }

    #[test]
    fn test_bucket_samples() {
        assert_eq!(weight_for(3), 10);
        assert_eq!(weight_for(20), 5);
        assert_eq!(weight_for(60), 2);
        assert_eq!(weight_for(150), 1);
        assert_eq!(weight_for(200), 0);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(weight_for(0), 10);
        assert_eq!(weight_for(6), 10);
        assert_eq!(weight_for(7), 5);
        assert_eq!(weight_for(29), 5);
        assert_eq!(weight_for(30), 2);
        assert_eq!(weight_for(89), 2);
        assert_eq!(weight_for(90), 1);
        assert_eq!(weight_for(179), 1);
        assert_eq!(weight_for(180), 0);
    }

    #[test]
    fn test_partial_days_truncate() {
        let now = Utc::now();
        // 6 days and 23 hours is still "less than 7 whole days"
        let added = now - Duration::days(6) - Duration::hours(23);
        assert_eq!(recency_weight(added, now), 10);
    }

    #[test]
    fn test_future_timestamp_counts_as_new() {
        let now = Utc::now();
        assert_eq!(recency_weight(now + Duration::days(2), now), 10);
    }
}
