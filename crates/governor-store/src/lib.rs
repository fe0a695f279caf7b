// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # governor-store
//!
//! `std`-only durable state store backends for `governor-core`.
//!
//! This crate provides [`FileStateStore`], a JSON file-backed implementation
//! of the [`governor_core::storage::StateStore`] trait suitable for CLI
//! tools, local agents, and server-side deployments that do not need a full
//! database.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use governor_store::FileStateStore;
//! use governor_core::config::GovernanceConfig;
//! use governor_core::engine::GovernanceLoop;
//!
//! let store = FileStateStore::open("/var/lib/governor/state.json")
//!     .expect("failed to open state file");
//!
//! let engine = GovernanceLoop::new(GovernanceConfig::default(), store).unwrap();
//! ```

pub mod storage;

pub use storage::file::FileStateStore;
