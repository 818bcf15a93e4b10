//! Knowledge expiry based on the candidate's `valid_until` stamp.

use chrono::{DateTime, NaiveDate, Utc};

use crate::pool::{Candidate, ExpiryStatus};

/// Parse a `valid_until` value: date-only first, then RFC3339. An empty or
/// unparseable value yields `None`, which callers treat as "never expires".
fn parse_valid_until(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Whether the candidate's validity window has passed as of `now`.
pub fn is_expired(candidate: &Candidate, now: DateTime<Utc>) -> bool {
    candidate
        .valid_until
        .as_deref()
        .and_then(parse_valid_until)
        .map(|deadline| now >= deadline)
        .unwrap_or(false)
}

/// Flip `expiry_status` between `Active` and `Expired` based on `now`.
/// An `Archived` expiry status is final and never overwritten.
pub fn update_expiry_status(candidate: &mut Candidate, now: DateTime<Utc>) {
    if candidate.expiry_status == ExpiryStatus::Archived {
        return;
    }
    candidate.expiry_status = if is_expired(candidate, now) {
        ExpiryStatus::Expired
    } else {
        ExpiryStatus::Active
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::KnowledgeType;

    fn cand(valid_until: Option<&str>) -> Candidate {
        let mut c = Candidate::new("e1", KnowledgeType::Reference, "docs link");
        c.valid_until = valid_until.map(String::from);
        c
    }

    #[test]
    fn test_past_date_expired() {
        assert!(is_expired(&cand(Some("2020-01-01")), Utc::now()));
    }

    #[test]
    fn test_future_date_active() {
        assert!(!is_expired(&cand(Some("2099-12-31")), Utc::now()));
    }

    #[test]
    fn test_rfc3339_form() {
        assert!(is_expired(&cand(Some("2020-06-30T12:00:00Z")), Utc::now()));
        assert!(!is_expired(&cand(Some("2099-06-30T12:00:00+02:00")), Utc::now()));
    }

    #[test]
    fn test_unparseable_never_expires() {
        assert!(!is_expired(&cand(Some("06/30/2026")), Utc::now()));
        assert!(!is_expired(&cand(Some("")), Utc::now()));
        assert!(!is_expired(&cand(None), Utc::now()));
    }

    #[test]
    fn test_update_flips_both_ways() {
        let mut c = cand(Some("2020-01-01"));
        update_expiry_status(&mut c, Utc::now());
        assert_eq!(c.expiry_status, ExpiryStatus::Expired);

        c.valid_until = Some("2099-12-31".to_string());
        update_expiry_status(&mut c, Utc::now());
        assert_eq!(c.expiry_status, ExpiryStatus::Active);
    }

    #[test]
    fn test_archived_is_final() {
        let mut c = cand(Some("2020-01-01"));
        c.expiry_status = ExpiryStatus::Archived;
        update_expiry_status(&mut c, Utc::now());
        assert_eq!(c.expiry_status, ExpiryStatus::Archived);
    }
}
