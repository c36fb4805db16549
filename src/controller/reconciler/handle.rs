//! # Instance Handle
//!
//! The copy of a `PostgreSql` resource a pass works on. Every status or
//! finalizer write goes through here and replaces the local copy with what the
//! API server returned, so later conditional writes carry the current
//! resource version.

use crate::constants::FINALIZER;
use crate::controller::reconciler::store::{InstanceEvent, InstanceStore};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{Condition, InstanceOutput, Phase, PostgreSql, PostgreSqlStatus};
use crate::observability::metrics;
use tracing::{debug, info};

const READY_CONDITION: &str = "Ready";

pub struct InstanceHandle<'a> {
    store: &'a dyn InstanceStore,
    instance: PostgreSql,
}

impl std::fmt::Debug for InstanceHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("name", &self.instance.metadata.name)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl<'a> InstanceHandle<'a> {
    pub fn new(store: &'a dyn InstanceStore, instance: PostgreSql) -> Self {
        Self { store, instance }
    }

    pub fn instance(&self) -> &PostgreSql {
        &self.instance
    }

    pub fn phase(&self) -> Phase {
        PostgreSqlStatus::effective_phase(self.instance.status.as_ref())
    }

    pub fn has_finalizer(&self) -> bool {
        self.instance
            .metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == FINALIZER))
    }

    /// Record a phase and description
    pub async fn set_phase(
        &mut self,
        phase: Phase,
        description: impl Into<String>,
    ) -> Result<(), ReconcilerError> {
        let output = self
            .instance
            .status
            .as_ref()
            .map(|s| s.output.clone())
            .unwrap_or_default();
        self.write_status(phase, description.into(), output).await
    }

    /// Record `Running` together with the instance outputs
    pub async fn set_running(
        &mut self,
        output: InstanceOutput,
        description: impl Into<String>,
    ) -> Result<(), ReconcilerError> {
        self.write_status(Phase::Running, description.into(), output)
            .await
    }

    /// Add our finalizer if missing and persist it
    pub async fn ensure_finalizer(&mut self) -> Result<(), ReconcilerError> {
        if self.has_finalizer() {
            return Ok(());
        }
        let mut finalizers = self.instance.metadata.finalizers.clone().unwrap_or_default();
        finalizers.push(FINALIZER.to_string());
        self.instance = self
            .store
            .set_finalizers(&self.instance, finalizers)
            .await?;
        info!("Added finalizer {}", FINALIZER);
        Ok(())
    }

    /// Remove our finalizer, leaving any others in place
    pub async fn remove_finalizer(&mut self) -> Result<(), ReconcilerError> {
        let finalizers: Vec<String> = self
            .instance
            .metadata
            .finalizers
            .iter()
            .flatten()
            .filter(|f| f.as_str() != FINALIZER)
            .cloned()
            .collect();
        self.instance = self
            .store
            .set_finalizers(&self.instance, finalizers)
            .await?;
        info!("Removed finalizer {}", FINALIZER);
        Ok(())
    }

    pub async fn publish(&self, event: InstanceEvent) {
        self.store.publish_event(&self.instance, event).await;
    }

    /// Skips the write when nothing the status reports would change
    async fn write_status(
        &mut self,
        phase: Phase,
        description: String,
        output: InstanceOutput,
    ) -> Result<(), ReconcilerError> {
        let current = self.instance.status.clone().unwrap_or_default();
        let generation = self.instance.metadata.generation;

        if current.phase == Some(phase)
            && current.description.as_deref() == Some(description.as_str())
            && current.output == output
            && current.observed_generation == generation
        {
            debug!(
                phase = phase.as_str(),
                "Skipping status update - phase and description unchanged"
            );
            return Ok(());
        }

        let now = chrono::Utc::now().to_rfc3339();
        let status = PostgreSqlStatus {
            phase: Some(phase),
            description: Some(description.clone()),
            output,
            conditions: vec![ready_condition(&current, phase, description, &now)],
            observed_generation: generation,
            last_reconcile_time: Some(now),
        };

        self.instance = self.store.patch_status(&self.instance, &status).await?;

        if current.phase != Some(phase) {
            metrics::increment_phase_transitions(phase.as_str());
            info!(phase = phase.as_str(), "Phase changed");
        }
        Ok(())
    }
}

fn ready_condition(
    previous: &PostgreSqlStatus,
    phase: Phase,
    message: String,
    now: &str,
) -> Condition {
    let (status, reason) = match phase {
        Phase::Running => ("True", "ReconciliationSucceeded"),
        Phase::Failed => ("False", "ReconciliationFailed"),
        Phase::Destroying => ("False", "Destroying"),
        Phase::Initializing | Phase::Applying => ("False", "ReconciliationInProgress"),
    };

    // The transition time only moves when the condition status flips
    let last_transition_time = previous
        .conditions
        .iter()
        .find(|c| c.r#type == READY_CONDITION && c.status == status)
        .and_then(|c| c.last_transition_time.clone())
        .unwrap_or_else(|| now.to_string());

    Condition {
        r#type: READY_CONDITION.to_string(),
        status: status.to_string(),
        last_transition_time: Some(last_transition_time),
        reason: Some(reason.to_string()),
        message: Some(message),
    }
}
