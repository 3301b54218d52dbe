// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Zonesync - DNS Zone and Monitoring Config Reconciler
//!
//! Zonesync keeps three independently-authoritative stores consistent: a
//! topology source (network-attached hosts, discovered via a TXT DNS
//! record), a resource directory (named services with live network
//! targets), and a DNS zone of CNAME records — plus a derived
//! health-check configuration file.
//!
//! ## Overview
//!
//! Each reconciliation cycle:
//!
//! - Resolves the topology mapping from the configured TXT record
//! - Computes the desired domain → CNAME pairings from the directory
//! - Converges the DNS zone to the desired state (diff and apply)
//! - Synthesizes monitoring endpoint definitions, with live TCP
//!   protocol/port detection for records not owned by any resource
//! - Writes the monitoring config atomically, and only on change
//!
//! Cycles are idempotent: all external state is re-read from scratch, so
//! a partially applied cycle self-heals on the next run.
//!
//! ## Modules
//!
//! - [`config`] - Settings tree loaded from YAML
//! - [`context`] - Shared context and the single-cycle guard
//! - [`topology`] - TXT-based topology discovery
//! - [`api_shapes`] - Tolerant decoding of API response envelopes
//! - [`directory`] - Resource directory REST client
//! - [`zone_api`] - DNS zone REST client with record-set semantics
//! - [`desired`] - Desired-state computation
//! - [`reconcile`] - Zone convergence
//! - [`monitoring`] - Monitoring endpoint synthesis
//! - [`orchestrator`] - The cycle entry point and error boundary
//!
//! ## Example
//!
//! ```rust,no_run
//! use zonesync::config::Settings;
//! use zonesync::context::Context;
//! use zonesync::orchestrator::SyncOrchestrator;
//!
//! # async fn example() {
//! let settings = Settings::load(std::path::Path::new("zonesync.yaml")).unwrap();
//! let ctx = Context::new(settings);
//! let orchestrator = SyncOrchestrator::new(ctx);
//!
//! if let Some(outcome) = orchestrator.try_run_cycle().await {
//!     println!("cycle success: {}", outcome.success);
//! }
//! # }
//! ```

pub mod api_shapes;
pub mod config;
pub mod constants;
pub mod context;
pub mod desired;
pub mod directory;
pub mod errors;
pub mod monitoring;
pub mod net;
pub mod orchestrator;
pub mod reconcile;
pub mod topology;
pub mod zone_api;
