//! # Watch Loop
//!
//! Controller watch loop that monitors PostgreSql resources and triggers
//! reconciliation when changes are detected.

use crate::constants::{WATCH_BACKOFF_MAX_MS, WATCH_BACKOFF_START_MS};
use crate::controller::reconciler::{classify, reconcile, Decision, Reconciler, ReconcilerError};
use crate::controller::server::ServerState;
use crate::crd::PostgreSql;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the controller stream when it ends and returns once a shutdown
/// signal marked the server not ready.
pub async fn run_watch_loop(
    instances: Api<PostgreSql>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    info!("Starting controller watch loop...");

    let backoff_duration_ms = Arc::new(AtomicU64::new(WATCH_BACKOFF_START_MS));
    let watch_restart_delay_secs = reconciler.config.watch_restart_delay_secs;
    let concurrency =
        u16::try_from(reconciler.config.max_concurrent_reconciliations).unwrap_or(u16::MAX);

    // SIGTERM/SIGINT mark the server not ready; in-flight passes finish first
    let shutdown_server_state = server_state.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let backoff = backoff_duration_ms.clone();
        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop",
            concurrency = concurrency
        );

        Controller::new(instances.clone(), watcher::Config::default().any_semantic())
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(
                admit_and_reconcile,
                |obj, error, ctx| handle_reconciliation_error(obj, error, ctx),
                reconciler.clone(),
            )
            .filter_map(move |x| {
                let backoff = backoff.clone();
                async move {
                    match &x {
                        Ok(_) => {
                            backoff.store(WATCH_BACKOFF_START_MS, Ordering::Relaxed);
                            debug!("watch.event.success");
                            Some(x)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                WATCH_BACKOFF_MAX_MS,
                                watch_restart_delay_secs,
                            )
                            .await
                            .map(|()| x)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(watch_span)
            .await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            watch_restart_delay_secs
        );
        tokio::time::sleep(std::time::Duration::from_secs(watch_restart_delay_secs)).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Skip events that need no pass, otherwise reconcile
///
/// The controller delivers every change including the status writes of our own
/// passes; only deletions, spec changes, elapsed retries and interrupted passes
/// get through.
async fn admit_and_reconcile(
    obj: Arc<PostgreSql>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown").to_string();
    let namespace = obj
        .metadata
        .namespace
        .as_deref()
        .unwrap_or("default")
        .to_string();

    match classify(&obj, ctx.config.retry_delay(), chrono::Utc::now()) {
        Decision::Skip(action) => {
            debug!(
                resource.name = name.as_str(),
                resource.namespace = namespace.as_str(),
                generation = ?obj.metadata.generation,
                "Skipping reconciliation - nothing changed since the last pass"
            );
            Ok(action)
        }
        Decision::Run(trigger) => {
            debug!(
                resource.name = name.as_str(),
                resource.namespace = namespace.as_str(),
                trigger_source = trigger.as_str(),
                "watch.event.received"
            );
            let result = reconcile(obj, ctx, trigger).await;
            match &result {
                Ok(action) => {
                    debug!(resource.name = name.as_str(), action = ?action, "watch.event.reconciled");
                }
                Err(e) => {
                    error!(resource.name = name.as_str(), error = %e, "watch.event.reconciliation_failed");
                }
            }
            result
        }
    }
}
