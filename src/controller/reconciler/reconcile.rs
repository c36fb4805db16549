//! # Reconcile
//!
//! One pass of the provisioning state machine for one `PostgreSql` resource.
//!
//! ```text
//! validate -> finalizer -> credentials -> stage manifests
//!   -> Initializing: bucket init + apply, instance init
//!   -> Applying: instance apply, output
//!   -> Running
//! ```
//!
//! Phases are written before the action they describe. Every terraform action is
//! re-runnable, so a pass interrupted anywhere converges when it runs again.

use crate::controller::reconciler::deletion::finalize;
use crate::controller::reconciler::handle::InstanceHandle;
use crate::controller::reconciler::store::InstanceEvent;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError, TriggerSource};
use crate::controller::reconciler::validation::validate_spec;
use crate::crd::{Phase, PostgreSql};
use crate::manifest::{compose, StagingArea};
use crate::observability::metrics;
use crate::provisioner::{ProvisionError, Workspace};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};

/// Run one pass for `instance`
///
/// Passes for the same resource never overlap: the pass holds the resource's
/// lock from start to finish and works on the copy read after taking it.
pub async fn reconcile(
    instance: Arc<PostgreSql>,
    ctx: Arc<Reconciler>,
    trigger: TriggerSource,
) -> Result<Action, ReconcilerError> {
    let name = instance
        .metadata
        .name
        .clone()
        .ok_or(ReconcilerError::MissingMetadata("name"))?;
    let namespace = instance
        .metadata
        .namespace
        .clone()
        .ok_or(ReconcilerError::MissingMetadata("namespace"))?;

    let span = tracing::info_span!(
        "reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        trigger = trigger.as_str()
    );

    async move {
        let start = Instant::now();
        metrics::increment_reconciliations();

        let lock = ctx.pass_lock(&namespace, &name);
        let _guard = lock.lock().await;

        // A pass that waited on the lock sees the writes of the one before it
        let Some(current) = ctx.instances.get(&namespace, &name).await? else {
            info!("Resource is gone, nothing to do");
            ctx.forget(&namespace, &name);
            return Ok(Action::await_change());
        };

        let staging = StagingArea::for_resource(&ctx.config.staging_root, &namespace, &name);
        let deleting = current.metadata.deletion_timestamp.is_some();
        let mut handle = InstanceHandle::new(ctx.instances.as_ref(), current);

        let result = if deleting {
            finalize(&ctx, &mut handle, &namespace, &name, &staging).await
        } else {
            provision(&ctx, &mut handle, &namespace, &name, &staging).await
        };

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        result
    }
    .instrument(span)
    .await
}

async fn provision(
    ctx: &Reconciler,
    handle: &mut InstanceHandle<'_>,
    namespace: &str,
    name: &str,
    staging: &StagingArea,
) -> Result<Action, ReconcilerError> {
    let declared = handle.instance().spec.clone();

    if let Err(e) = validate_spec(&declared, name) {
        warn!(error = %e, "Rejecting invalid spec");
        handle
            .publish(InstanceEvent::warning("InvalidSpec", "Validate", e.to_string()))
            .await;
        return Err(e.into());
    }

    handle.ensure_finalizer().await?;

    let spec = declared.with_defaults(name);

    let credentials = match ctx.credentials.resolve(namespace, &spec.users, staging).await {
        Ok(credentials) => credentials,
        Err(e) => {
            return fail(
                ctx,
                handle,
                e.reason(),
                format!("credential resolution failed: {e}"),
            )
            .await;
        }
    };

    let staged = compose(&spec, &credentials.passwords)
        .and_then(|manifests| staging.write_manifests(&manifests));
    if let Err(e) = staged {
        error!(error = %e, "Failed to stage manifests");
        handle
            .publish(InstanceEvent::warning("RenderFailed", "Render", e.to_string()))
            .await;
        return Err(e.into());
    }
    drop(credentials.passwords);

    let bucket = Workspace::new(staging.bucket_dir(), credentials.service_account_key.clone());
    let instance = Workspace::new(staging.instance_dir(), credentials.service_account_key);

    handle
        .set_phase(Phase::Initializing, "Provisioning state bucket")
        .await?;
    let provisioned = match ctx.provisioner.init(&bucket).await {
        Ok(()) => ctx.provisioner.apply(&bucket).await,
        Err(e) => Err(e),
    };
    if let Err(e) = provisioned {
        return provision_failed(ctx, handle, &e).await;
    }
    handle
        .publish(InstanceEvent::normal(
            "BucketProvisioned",
            "Provision",
            format!("State bucket {} provisioned", spec.bucket_config.name),
        ))
        .await;

    handle
        .set_phase(Phase::Initializing, "Initializing instance backend")
        .await?;
    if let Err(e) = ctx.provisioner.init(&instance).await {
        return provision_failed(ctx, handle, &e).await;
    }
    handle
        .publish(InstanceEvent::normal(
            "BackendInitialized",
            "Provision",
            format!(
                "Backend initialized in gs://{}/{}",
                spec.remote_state.bucket_name, spec.remote_state.bucket_prefix
            ),
        ))
        .await;

    handle
        .set_phase(Phase::Applying, "Applying instance manifests")
        .await?;
    if let Err(e) = ctx.provisioner.apply(&instance).await {
        return provision_failed(ctx, handle, &e).await;
    }
    handle
        .publish(InstanceEvent::normal(
            "InstanceProvisioned",
            "Provision",
            format!("Instance {} provisioned", spec.sql_instance.name),
        ))
        .await;

    let output = match ctx.provisioner.output(&instance).await {
        Ok(output) => output,
        Err(e) => return provision_failed(ctx, handle, &e).await,
    };

    info!(
        connection_name = output.connection_name.as_str(),
        connection_ip_address = output.connection_ip_address.as_str(),
        "Instance is running"
    );
    let note = format!("Instance reachable at {}", output.connection_ip_address);
    handle.set_running(output, "Instance provisioned").await?;
    handle
        .publish(InstanceEvent::normal("Synced", "Reconcile", note))
        .await;

    if ctx.reset_backoff(namespace, name) {
        info!("Backoff reset after successful reconciliation");
    }
    Ok(Action::await_change())
}

async fn provision_failed(
    ctx: &Reconciler,
    handle: &mut InstanceHandle<'_>,
    error: &ProvisionError,
) -> Result<Action, ReconcilerError> {
    fail(ctx, handle, error.reason(), error.to_string()).await
}

/// Move to `Failed` and retry after the fixed delay
async fn fail(
    ctx: &Reconciler,
    handle: &mut InstanceHandle<'_>,
    reason: &'static str,
    description: String,
) -> Result<Action, ReconcilerError> {
    error!(reason = reason, "{}", description);
    handle.set_phase(Phase::Failed, description.clone()).await?;
    handle
        .publish(InstanceEvent::warning(reason, "Reconcile", description))
        .await;

    metrics::increment_requeues_total("retry-delay");
    Ok(Action::requeue(ctx.config.retry_delay()))
}
