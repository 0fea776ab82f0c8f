use chrono::{DateTime, Duration, Utc};

use crate::models::{Policy, UNBOUNDED_PAST};

/// Time range a policy evaluates, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyWindow {
    /// `None` for an unbounded past.
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window end {end} precedes start {start}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("window offset {0}s is out of range")]
    OutOfRange(i64),
}

impl PolicyWindow {
    /// `[now - target_end, now - target_start]`.
    pub fn for_policy(policy: &Policy, now: DateTime<Utc>) -> Result<Self, WindowError> {
        let end = offset(now, policy.target_start)?;
        let start = if policy.target_end == UNBOUNDED_PAST {
            None
        } else {
            Some(offset(now, policy.target_end)?)
        };

        if let Some(start) = start
            && end < start
        {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }
}

fn offset(now: DateTime<Utc>, secs: i64) -> Result<DateTime<Utc>, WindowError> {
    Duration::try_seconds(secs)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or(WindowError::OutOfRange(secs))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;
    use uuid::Uuid;

    use super::*;
    use crate::models::{PolicyAction, PolicyTarget};

    fn policy(target_start: i64, target_end: i64) -> Policy {
        Policy {
            id: Uuid::new_v4(),
            name: "p".into(),
            target: PolicyTarget::Backup,
            action: PolicyAction::Delete,
            target_start,
            target_end,
            step: 0,
            backup_set_id: Uuid::new_v4(),
            app_set_ids: vec![],
            host_ids: vec![],
            path_ids: vec![],
            created_at: Utc::now(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_bounded_window() {
        let window = PolicyWindow::for_policy(&policy(3600, 86400), now()).unwrap();
        assert_eq!(window.end, now() - Duration::hours(1));
        assert_eq!(window.start, Some(now() - Duration::days(1)));
    }

    #[test]
    fn test_unbounded_past() {
        let window = PolicyWindow::for_policy(&policy(0, UNBOUNDED_PAST), now()).unwrap();
        assert_eq!(window.start, None);
        assert_eq!(window.end, now());
    }

    #[rstest]
    #[case(86400, 3600)]
    #[case(10, 0)]
    fn test_inverted_window_rejected(#[case] start: i64, #[case] end: i64) {
        assert!(matches!(
            PolicyWindow::for_policy(&policy(start, end), now()),
            Err(WindowError::Inverted { .. })
        ));
    }

    #[test]
    fn test_empty_instant_window_allowed() {
        let window = PolicyWindow::for_policy(&policy(60, 60), now()).unwrap();
        assert_eq!(window.start, Some(window.end));
    }

    #[test]
    fn test_out_of_range_offset() {
        assert!(matches!(
            PolicyWindow::for_policy(&policy(i64::MAX, UNBOUNDED_PAST), now()),
            Err(WindowError::OutOfRange(_))
        ));
    }
}
