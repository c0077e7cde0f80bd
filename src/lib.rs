//! Backbeat Relayer - on-chain transaction reliability engine
//!
//! Game flows (store purchases, rewards, soul minting, energy items, card
//! gifts) submit their on-chain operations through an external execution
//! engine with an asynchronous transaction lifecycle. This crate supplies the
//! tracked-retry and confirmation-polling protocol that makes those flows
//! reliable: a foreground confirmation supervisor with a bounded budget, a
//! detached background monitor for transactions that outlive it, and a
//! multi-step purchase orchestrator that never submits a dependent step
//! before its predecessor is confirmed mined.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod metrics;
pub mod ops;
pub mod orchestrator;
pub mod supervisor;
