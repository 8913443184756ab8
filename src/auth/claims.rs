// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and the authenticated caller.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims read from a vault store bearer token.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenClaims {
    /// Subject (account identifier)
    #[serde(default)]
    pub sub: String,

    /// Email of the account; the identity vaults are shared with
    #[serde(default)]
    pub email: Option<String>,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,
}

/// The authenticated user making a request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Caller {
    /// Email used for `sharedBy`, `receipts` and `imported`
    pub email: String,

    /// Account identifier from the `sub` claim
    pub subject: String,

    /// Token expiry (seconds since the epoch, 0 when absent)
    pub expires_at: i64,
}

impl Caller {
    /// Normalize an email for identity comparisons.
    pub fn normalize_email(email: &str) -> String {
        crate::models::normalize_email(email)
    }
}
