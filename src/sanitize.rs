// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Key Sanitizer
//!
//! The vault store uses keys as path segments, which forbids a handful of
//! characters. Each forbidden character is replaced by a placeholder token:
//!
//! | character | placeholder |
//! |-----------|-------------|
//! | `.` | `_DOT_` |
//! | `#` | `_HASH_` |
//! | `$` | `_DOLLAR_` |
//! | `/` | `_SLASH_` |
//! | `[` | `_LEFT_BRACKET_` |
//! | `]` | `_RIGHT_BRACKET_` |
//!
//! `unsanitize_key(sanitize_key(k)) == k` holds for every key that does not
//! already contain one of the placeholder tokens. A key that does contain one
//! is indistinguishable from an encoded key and will be decoded.
//!
//! Placeholders contain no forbidden characters, so `sanitize_key` is
//! idempotent.

use crate::models::LocalStorageMap;

/// Forbidden characters and their placeholders, in match priority order.
const PLACEHOLDERS: [(char, &str); 6] = [
    ('.', "_DOT_"),
    ('#', "_HASH_"),
    ('$', "_DOLLAR_"),
    ('/', "_SLASH_"),
    ('[', "_LEFT_BRACKET_"),
    (']', "_RIGHT_BRACKET_"),
];

fn placeholder_for(c: char) -> Option<&'static str> {
    PLACEHOLDERS
        .iter()
        .find(|(forbidden, _)| *forbidden == c)
        .map(|(_, token)| *token)
}

/// Replace every forbidden character with its placeholder.
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match placeholder_for(c) {
            Some(token) => out.push_str(token),
            None => out.push(c),
        }
    }
    out
}

/// Replace every placeholder token with the character it encodes.
///
/// Tokens are matched atomically while scanning left to right; at each
/// position the first matching token wins and scanning resumes after it.
pub fn unsanitize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut rest = key;

    'scan: while !rest.is_empty() {
        for (original, token) in PLACEHOLDERS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push(original);
                rest = tail;
                continue 'scan;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Sanitize every key of a local-storage mapping. Values are untouched.
pub fn sanitize_map(entries: &LocalStorageMap) -> LocalStorageMap {
    entries
        .iter()
        .map(|(key, value)| (sanitize_key(key), value.clone()))
        .collect()
}

/// Unsanitize every key of a local-storage mapping. Values are untouched.
pub fn unsanitize_map(entries: &LocalStorageMap) -> LocalStorageMap {
    entries
        .iter()
        .map(|(key, value)| (unsanitize_key(key), value.clone()))
        .collect()
}
