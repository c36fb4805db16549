//! # Deletion
//!
//! Teardown of a `PostgreSql` resource marked for deletion. The finalizer is
//! only released once the instance set and then the bucket set are destroyed
//! and the staging area (with the staged key) is removed.
//!
//! A resource that ended in `Failed` is released without teardown.

use crate::controller::reconciler::handle::InstanceHandle;
use crate::controller::reconciler::store::InstanceEvent;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::Phase;
use crate::manifest::{compose, StagingArea};
use crate::observability::metrics;
use crate::provisioner::{ProvisionError, Workspace};
use kube_runtime::controller::Action;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

pub(crate) async fn finalize(
    ctx: &Reconciler,
    handle: &mut InstanceHandle<'_>,
    namespace: &str,
    name: &str,
    staging: &StagingArea,
) -> Result<Action, ReconcilerError> {
    if !handle.has_finalizer() {
        debug!("Resource is being deleted and carries no finalizer of ours");
        return Ok(Action::await_change());
    }

    if handle.phase() == Phase::Failed {
        info!("Resource failed to provision, releasing it without teardown");
        if let Err(e) = staging.remove() {
            warn!(error = %e, "Failed to remove staging directory");
        }
        handle.remove_finalizer().await?;
        ctx.forget(namespace, name);
        return Ok(Action::await_change());
    }

    handle
        .set_phase(Phase::Destroying, "Destroying instance and state bucket")
        .await?;

    let credentials_file = match ensure_staged(ctx, handle, namespace, name, staging).await {
        Ok(path) => path,
        Err((reason, description)) => return retry(ctx, handle, reason, description).await,
    };

    for (set, dir) in [
        ("instance", staging.instance_dir()),
        ("bucket", staging.bucket_dir()),
    ] {
        let workspace = Workspace::new(dir, credentials_file.clone());
        if let Err(e) = destroy(ctx, &workspace).await {
            let description = format!("failed to destroy {set}: {e}");
            return retry(ctx, handle, e.reason(), description).await;
        }
        info!(set = set, "Destroyed");
    }

    if let Err(e) = staging.remove() {
        return retry(
            ctx,
            handle,
            "CleanupFailed",
            format!("failed to remove staging directory: {e}"),
        )
        .await;
    }

    handle
        .publish(InstanceEvent::normal(
            "Destroyed",
            "Destroy",
            "Instance and state bucket destroyed",
        ))
        .await;
    handle.remove_finalizer().await?;
    ctx.forget(namespace, name);
    Ok(Action::await_change())
}

/// Terraform state lives in the bucket, so an uninitialized directory (e.g.
/// after a controller restart) only needs `init` before `destroy`
async fn destroy(ctx: &Reconciler, workspace: &Workspace) -> Result<(), ProvisionError> {
    if !StagingArea::is_initialized(&workspace.dir) {
        ctx.provisioner.init(workspace).await?;
    }
    ctx.provisioner.destroy(workspace).await
}

/// Staged key file, re-staging everything when a previous pass left nothing behind
async fn ensure_staged(
    ctx: &Reconciler,
    handle: &InstanceHandle<'_>,
    namespace: &str,
    name: &str,
    staging: &StagingArea,
) -> Result<PathBuf, (&'static str, String)> {
    if let Some(path) = staging.staged_credentials_file() {
        if staging.instance_dir().is_dir() && staging.bucket_dir().is_dir() {
            return Ok(path);
        }
    }

    info!("Staging directory missing, staging manifests again for teardown");
    let spec = handle.instance().spec.with_defaults(name);
    let credentials = ctx
        .credentials
        .resolve(namespace, &spec.users, staging)
        .await
        .map_err(|e| (e.reason(), format!("credential resolution failed: {e}")))?;
    compose(&spec, &credentials.passwords)
        .and_then(|manifests| staging.write_manifests(&manifests))
        .map_err(|e| ("RenderFailed", format!("failed to stage manifests: {e}")))?;
    Ok(credentials.service_account_key)
}

/// Stay in `Destroying` and retry after the fixed delay
async fn retry(
    ctx: &Reconciler,
    handle: &mut InstanceHandle<'_>,
    reason: &'static str,
    description: String,
) -> Result<Action, ReconcilerError> {
    error!(reason = reason, "{}", description);
    handle
        .set_phase(Phase::Destroying, description.clone())
        .await?;
    handle
        .publish(InstanceEvent::warning(reason, "Destroy", description))
        .await;

    metrics::increment_requeues_total("retry-delay");
    Ok(Action::requeue(ctx.config.retry_delay()))
}
