// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Transfer Infrastructure Module
//!
//! Concrete implementations of the TransferGateway trait.

pub mod http;
pub mod memory;

pub use http::HttpTransferGateway;
pub use memory::InMemoryTransferGateway;
