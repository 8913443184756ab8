// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer JWT authentication for the vault store API.
//!
//! ## Auth Flow
//!
//! 1. The extension signs the user in and obtains a JWT
//! 2. Every request carries `Authorization: Bearer <JWT>`
//! 3. The store:
//!    - Verifies the HS256 signature and expiry (`VAULT_JWT_SECRET` set)
//!    - Or only decodes the token (development mode, secret unset)
//!    - Extracts `email` → the caller identity used for `sharedBy`,
//!      `receipts` and `imported`
//!
//! ## Security
//!
//! - All `/v1` endpoints require authentication
//! - Tokens without an `email` claim are rejected
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;

pub use claims::Caller;
pub use error::AuthError;
pub use extractor::Auth;
