// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Custodial Ledger - Wallet Balances, Transfers and Deposit Reconciliation
//!
//! This crate keeps one balance per user in an embedded ACID store, moves
//! funds between wallets atomically, credits deposits from signed payment
//! provider webhooks and authenticates machine callers with scoped API keys.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Session tokens, API keys and the request principal
//! - `credentials` - API key issuance, hashing, revocation and rollover
//! - `deposits` - Deposit initiation and webhook reconciliation
//! - `ledger` - Wallets, transfers and transaction history
//! - `providers` - Payment provider clients (Paystack)
//! - `storage` - redb-backed repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod deposits;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;
pub mod ttl;
