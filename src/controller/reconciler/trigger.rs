//! # Trigger Classification
//!
//! Decides whether a watch event (or startup listing) should start a pass.
//! Status writes made by the controller itself produce watch events too; those
//! must not restart provisioning of a resource that already converged, and a
//! failed resource waits out the fixed retry delay counted from its last
//! status write.

use crate::controller::reconciler::types::TriggerSource;
use crate::crd::{Phase, PostgreSql, PostgreSqlStatus};
use chrono::{DateTime, Utc};
use kube_runtime::controller::Action;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Run(TriggerSource),
    Skip(Action),
}

pub fn classify(instance: &PostgreSql, retry_delay: Duration, now: DateTime<Utc>) -> Decision {
    let status = instance.status.as_ref();
    let phase = PostgreSqlStatus::effective_phase(status);

    if instance.metadata.deletion_timestamp.is_some() {
        // A failed teardown stays in Destroying and waits out the delay as well
        if phase == Phase::Destroying {
            if let Some(remaining) = retry_wait(status, retry_delay, now) {
                return Decision::Skip(Action::requeue(remaining));
            }
        }
        return Decision::Run(TriggerSource::Deletion);
    }

    let observed_generation = status.and_then(|s| s.observed_generation);
    if observed_generation.is_none() || instance.metadata.generation != observed_generation {
        return Decision::Run(TriggerSource::SpecChange);
    }

    match phase {
        Phase::Running => Decision::Skip(Action::await_change()),
        Phase::Failed => match retry_wait(status, retry_delay, now) {
            Some(remaining) => Decision::Skip(Action::requeue(remaining)),
            None => Decision::Run(TriggerSource::RetryAfterFailure),
        },
        Phase::Initializing | Phase::Applying | Phase::Destroying => {
            Decision::Run(TriggerSource::Resume)
        }
    }
}

/// Time left until `retry_delay` has passed since the last status write
fn retry_wait(
    status: Option<&PostgreSqlStatus>,
    retry_delay: Duration,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let last_write = status
        .and_then(|s| s.last_reconcile_time.as_deref())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())?
        .with_timezone(&Utc);
    let retry_at = last_write + chrono::Duration::from_std(retry_delay).ok()?;
    (retry_at > now).then(|| (retry_at - now).to_std().unwrap_or(retry_delay))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::PostgreSqlSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

    fn instance(generation: i64, status: Option<PostgreSqlStatus>) -> PostgreSql {
        let mut instance = PostgreSql::new("pg", PostgreSqlSpec::default());
        instance.metadata.generation = Some(generation);
        instance.status = status;
        instance
    }

    fn status(phase: Phase, observed_generation: i64, at: &str) -> PostgreSqlStatus {
        PostgreSqlStatus {
            phase: Some(phase),
            observed_generation: Some(observed_generation),
            last_reconcile_time: Some(at.to_string()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    const RETRY: Duration = Duration::from_secs(5);

    #[test]
    fn test_new_resource_runs() {
        assert_eq!(
            classify(&instance(1, None), RETRY, now()),
            Decision::Run(TriggerSource::SpecChange)
        );
    }

    #[test]
    fn test_spec_change_runs_even_when_running() {
        let pg = instance(2, Some(status(Phase::Running, 1, "2024-05-01T11:00:00Z")));
        assert_eq!(
            classify(&pg, RETRY, now()),
            Decision::Run(TriggerSource::SpecChange)
        );
    }

    #[test]
    fn test_status_only_update_on_running_is_skipped() {
        let pg = instance(1, Some(status(Phase::Running, 1, "2024-05-01T11:00:00Z")));
        assert_eq!(
            classify(&pg, RETRY, now()),
            Decision::Skip(Action::await_change())
        );
    }

    #[test]
    fn test_failed_waits_for_retry_delay() {
        let pg = instance(1, Some(status(Phase::Failed, 1, "2024-05-01T11:59:58Z")));
        assert_eq!(
            classify(&pg, RETRY, now()),
            Decision::Skip(Action::requeue(Duration::from_secs(3)))
        );
    }

    #[test]
    fn test_failed_retries_after_delay() {
        let pg = instance(1, Some(status(Phase::Failed, 1, "2024-05-01T11:59:00Z")));
        assert_eq!(
            classify(&pg, RETRY, now()),
            Decision::Run(TriggerSource::RetryAfterFailure)
        );
    }

    #[test]
    fn test_interrupted_pass_resumes() {
        let pg = instance(1, Some(status(Phase::Applying, 1, "2024-05-01T11:59:59Z")));
        assert_eq!(classify(&pg, RETRY, now()), Decision::Run(TriggerSource::Resume));
    }

    fn deleting(mut pg: PostgreSql) -> PostgreSql {
        pg.metadata.deletion_timestamp =
            Some(serde_json::from_value::<Time>(serde_json::json!("2024-05-01T12:00:00Z")).unwrap());
        pg
    }

    #[test]
    fn test_deletion_runs_regardless_of_generation() {
        let pg = deleting(instance(1, Some(status(Phase::Running, 1, "2024-05-01T11:59:59Z"))));
        assert_eq!(
            classify(&pg, RETRY, now()),
            Decision::Run(TriggerSource::Deletion)
        );
    }

    #[test]
    fn test_failed_teardown_waits_for_retry_delay() {
        let recent = deleting(instance(1, Some(status(Phase::Destroying, 1, "2024-05-01T11:59:59Z"))));
        assert_eq!(
            classify(&recent, RETRY, now()),
            Decision::Skip(Action::requeue(Duration::from_secs(4)))
        );

        let old = deleting(instance(1, Some(status(Phase::Destroying, 1, "2024-05-01T11:00:00Z"))));
        assert_eq!(
            classify(&old, RETRY, now()),
            Decision::Run(TriggerSource::Deletion)
        );
    }
}
