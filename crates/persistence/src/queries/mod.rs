// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Read-only queries for the persistence layer.
//!
//! ## Module Organization
//!
//! - `audit`: Audit event queries
//! - `categories`: Hazard category table verification
//! - `permits`: Permit loading and listing

pub mod audit;
pub mod categories;
pub mod permits;

pub use permits::{MAX_LIST_LIMIT, PermitQuery, PermitSummary};
