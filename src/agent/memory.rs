// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory page storage and navigation for exercising the page agent
//! without a browser.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AgentError, PageControl, StorageRepository};
use crate::models::LocalStorageMap;

/// Local storage area held in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<LocalStorageMap>,
    write_failure: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: LocalStorageMap) -> Self {
        Self {
            entries: Mutex::new(entries),
            write_failure: Mutex::new(None),
        }
    }

    /// Make every subsequent write fail with `reason`.
    pub fn fail_writes(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.write_failure.lock() {
            *failure = Some(reason.into());
        }
    }
}

impl StorageRepository for MemoryStorage {
    fn read(&self) -> LocalStorageMap {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    fn write(&self, entries: &LocalStorageMap) -> Result<(), AgentError> {
        if let Some(reason) = self
            .write_failure
            .lock()
            .ok()
            .and_then(|failure| failure.clone())
        {
            return Err(AgentError::StorageWrite(reason));
        }

        let mut stored = self
            .entries
            .lock()
            .map_err(|_| AgentError::StorageWrite("storage lock poisoned".to_string()))?;
        for (key, value) in entries {
            stored.insert(key.clone(), value.clone());
        }
        Ok(())
    }
}

/// Page navigation state held in memory. Counts reloads.
#[derive(Debug)]
pub struct MemoryPage {
    url: Mutex<String>,
    reloads: AtomicUsize,
}

impl MemoryPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Mutex::new(url.into()),
            reloads: AtomicUsize::new(0),
        }
    }

    /// Simulate navigation to another URL.
    pub fn navigate(&self, url: impl Into<String>) {
        if let Ok(mut current) = self.url.lock() {
            *current = url.into();
        }
    }

    /// Number of reloads issued so far.
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl PageControl for MemoryPage {
    fn url(&self) -> String {
        self.url.lock().map(|url| url.clone()).unwrap_or_default()
    }

    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_merges_into_existing_entries() {
        let mut initial = LocalStorageMap::new();
        initial.insert("a".to_string(), "old".to_string());
        let storage = MemoryStorage::with_entries(initial);

        let mut update = LocalStorageMap::new();
        update.insert("a".to_string(), "new".to_string());
        update.insert("b".to_string(), "2".to_string());
        storage.write(&update).unwrap();

        assert_eq!(storage.read(), update);
    }

    #[test]
    fn page_tracks_navigation_and_reloads() {
        let page = MemoryPage::new("https://a.example/");
        page.navigate("https://b.example/");
        page.reload();
        assert_eq!(page.url(), "https://b.example/");
        assert_eq!(page.reloads(), 1);
    }
}
