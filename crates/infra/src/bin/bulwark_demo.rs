//! Drives concurrent guarded calls against simulated upstreams and logs how
//! each one was resolved.
//!
//! Phase one fires bursts at a flaky `externalService` until its circuit
//! breaker opens. Phase two fires one burst at the slow `miServicio`, more
//! calls than its bulkhead admits. Ctrl-C cancels whatever is in flight.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bulwark_common::resilience::TracingListener;
use bulwark_core::{AdminService, GuardedDataService, ResilienceRegistry};
use bulwark_domain::constants::{EXTERNAL_SERVICE, SLOW_SERVICE};
use bulwark_domain::{Config, GuardedResponse};
use bulwark_infra::{config, observability, SimulatedExternalService};
use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const BURST_PAUSE: Duration = Duration::from_millis(500);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_or_default().context("loading configuration")?;
    observability::init_tracing(&config.logging).context("initialising tracing")?;

    let registry = Arc::new(ResilienceRegistry::from_config(&config)?);
    registry.events().subscribe(Arc::new(TracingListener));
    let admin = AdminService::new(Arc::clone(&registry));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight calls");
            signal_token.cancel();
        }
    });

    run_external_bursts(&registry, &config, &shutdown).await?;
    run_slow_burst(&registry, &config, &shutdown).await?;

    for status in admin.all_breaker_statuses() {
        info!(snapshot = %serde_json::to_string(&status)?, "circuit breaker");
    }
    for status in admin.all_bulkhead_statuses() {
        info!(
            name = %status.name,
            permitted = status.permitted_calls,
            rejected = status.rejected_calls,
            "bulkhead"
        );
    }
    Ok(())
}

async fn run_external_bursts(
    registry: &ResilienceRegistry,
    config: &Config,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let simulation = &config.simulation;
    let source = Arc::new(SimulatedExternalService::new(
        EXTERNAL_SERVICE,
        simulation.failure_probability,
        Duration::from_millis(simulation.latency_ms),
    ));
    let service = GuardedDataService::new(registry, source.clone(), &config.fallback)?;

    for burst in 1..=simulation.bursts {
        if shutdown.is_cancelled() {
            break;
        }
        let responses = fire(&service, simulation.burst_size, shutdown).await;
        log_burst(EXTERNAL_SERVICE, burst, &responses);

        if let Some(breaker) = service.guard().circuit_breaker() {
            let snapshot = breaker.snapshot();
            info!(
                burst,
                state = %snapshot.state,
                failure_rate = snapshot.failure_rate,
                "breaker after burst"
            );
        }
        tokio::time::sleep(BURST_PAUSE).await;
    }

    info!(health = %source.health(), "upstream");
    Ok(())
}

async fn run_slow_burst(
    registry: &ResilienceRegistry,
    config: &Config,
    shutdown: &CancellationToken,
) -> anyhow::Result<()> {
    let simulation = &config.simulation;
    let source = Arc::new(SimulatedExternalService::new(
        SLOW_SERVICE,
        simulation.slow_failure_probability,
        Duration::from_millis(simulation.slow_latency_ms),
    ));
    let service = GuardedDataService::new(registry, source, &config.fallback)?;

    let responses = fire(&service, simulation.burst_size, shutdown).await;
    log_burst(SLOW_SERVICE, 1, &responses);
    Ok(())
}

/// `count` concurrent fetches through the guard
async fn fire(
    service: &GuardedDataService,
    count: usize,
    shutdown: &CancellationToken,
) -> Vec<GuardedResponse<Value>> {
    join_all((0..count).map(|_| service.fetch_with_cancellation(shutdown))).await
}

fn log_burst(resource: &str, burst: usize, responses: &[GuardedResponse<Value>]) {
    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_reason: BTreeMap<String, usize> = BTreeMap::new();
    for response in responses {
        *by_source.entry(response.source.to_string()).or_default() += 1;
        if let Some(reason) = response.reason {
            *by_reason.entry(reason.to_string()).or_default() += 1;
        }
    }
    info!(resource, burst, sources = ?by_source, reasons = ?by_reason, "burst resolved");
}
