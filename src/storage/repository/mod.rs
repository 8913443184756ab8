// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to document storage.

pub mod vaults;

pub use vaults::VaultRepository;
