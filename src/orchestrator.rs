// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The reconciliation cycle.
//!
//! Runs the pipeline steps in a fixed sequence: resolve topology → seed
//! the monitoring generator → build desired pairs → converge the zone →
//! generate the monitoring config → write it if changed. Counts are
//! accumulated into a [`CycleSummary`].
//!
//! This is the single error boundary of the pipeline: every component
//! below is fail-soft already, and anything unexpected that still
//! surfaces here is caught, logged and folded into the summary's error
//! list. [`SyncOrchestrator::run_cycle`] never returns an error and never
//! panics by contract; callers always receive a [`CycleOutcome`].

use crate::context::Context;
use crate::desired::DesiredStateBuilder;
use crate::directory::DirectoryClient;
use crate::monitoring::MonitoringGenerator;
use crate::reconcile::ZoneReconciler;
use crate::topology::TopologyResolver;
use crate::zone_api::ZoneClient;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

/// Machine-readable result of one reconciliation cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    /// When the cycle started
    pub started_at: DateTime<Utc>,

    /// When the cycle finished
    pub finished_at: Option<DateTime<Utc>>,

    /// Topology hosts discovered
    pub topology_hosts: usize,

    /// Desired CNAME pairs computed
    pub desired_pairs: usize,

    /// Zone records present after convergence
    pub zone_records: usize,

    /// Monitoring endpoints generated
    pub endpoints: usize,

    /// Whether the monitoring config file was rewritten
    pub config_written: bool,

    /// Errors caught at the cycle boundary
    pub errors: Vec<String>,
}

impl CycleSummary {
    fn begin() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            topology_hosts: 0,
            desired_pairs: 0,
            zone_records: 0,
            endpoints: 0,
            config_written: false,
            errors: Vec::new(),
        }
    }
}

/// Outcome handed to the scheduler or on-demand trigger.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    /// Whether the cycle completed without boundary errors
    pub success: bool,

    /// The cycle's summary
    pub summary: CycleSummary,
}

/// Drives one reconciliation cycle end to end.
pub struct SyncOrchestrator {
    ctx: Context,
}

impl SyncOrchestrator {
    /// Create an orchestrator over a shared context.
    #[must_use]
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Run a cycle if none is in flight.
    ///
    /// Returns `None` when another cycle holds the running flag; the
    /// request is rejected, not queued.
    pub async fn try_run_cycle(&self) -> Option<CycleOutcome> {
        let _guard = self.ctx.try_begin_cycle()?;
        Some(self.run_cycle().await)
    }

    /// Run one reconciliation cycle.
    ///
    /// Never returns an error: any failure is recorded in the summary and
    /// reflected in the success flag. Partial progress is acceptable; the
    /// next cycle re-reads all external state and convergence is
    /// idempotent, so a failed cycle self-heals on retry.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut summary = CycleSummary::begin();
        info!("Starting reconciliation cycle");

        let result = self.run_steps(&mut summary).await;
        summary.finished_at = Some(Utc::now());

        match result {
            Ok(()) => {
                info!(
                    pairs = summary.desired_pairs,
                    records = summary.zone_records,
                    endpoints = summary.endpoints,
                    written = summary.config_written,
                    "Reconciliation cycle finished"
                );
                CycleOutcome {
                    success: true,
                    summary,
                }
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Reconciliation cycle failed");
                summary.errors.push(format!("{e:#}"));
                CycleOutcome {
                    success: false,
                    summary,
                }
            }
        }
    }

    /// The fixed step sequence of one cycle.
    async fn run_steps(&self, summary: &mut CycleSummary) -> Result<()> {
        let settings = &self.ctx.settings;

        let resolver = TopologyResolver::new(
            &settings.topology.source,
            &settings.topology.resolver,
        );
        let topology = resolver.resolve().await;
        summary.topology_hosts = topology.len();

        let mut generator = MonitoringGenerator::new(&self.ctx);
        generator.set_topology(topology.clone());

        let directory = DirectoryClient::new(&self.ctx);
        let builder = DesiredStateBuilder::new(&directory, &settings.domain);
        let pairs = builder.build_desired_pairs(&topology).await;
        summary.desired_pairs = pairs.len();

        let zone = ZoneClient::new(&self.ctx);
        let reconciler = ZoneReconciler::new(
            &zone,
            &settings.domain,
            &settings.reconciler.keep_records,
            &settings.reconciler.ignore_subdomains,
            &settings.reconciler.root_aliases,
        );
        let records = reconciler.reconcile(&pairs).await;
        summary.zone_records = records.len();

        let config = generator.generate(&pairs, &records).await;
        summary.endpoints = config.endpoints.len();

        summary.config_written =
            generator.write_if_changed(&config, &settings.monitoring.output_path)?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;
