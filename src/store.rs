// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Processed-transaction store with deduplication.
//!
//! Membership is answered by a [`DashMap`] keyed by transaction hash; the
//! records themselves are kept oldest-first in a deque that is written to
//! the history file on every append. A reservation taken through the map's
//! entry API is the check-and-reserve step that keeps the live stream and
//! the backfill scan from both issuing for the same hash.
//!
//! # Flush contract
//!
//! [`ProcessedStore::record`] returns only after the whole history has been
//! written to a temporary file, synced, and renamed over the history file.
//! An error from it means the outcome may not be durable and the process
//! must stop. Async callers commit through
//! [`Reservation::commit_in_background`], which runs the write on the
//! blocking pool.

use crate::base::TransactionHash;
use crate::error::StoreError;
use crate::transaction::{ProcessedRecord, ProcessingStatus};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// A handler owns this hash and has not recorded an outcome yet.
    Reserved,
    Recorded(ProcessingStatus),
}

/// Durable record of handled transactions, bounded to `capacity` entries.
#[derive(Debug)]
pub struct ProcessedStore {
    path: Option<PathBuf>,
    capacity: usize,
    slots: DashMap<TransactionHash, Slot>,
    /// Oldest first. The lock also serializes file writes.
    records: Mutex<VecDeque<ProcessedRecord>>,
}

impl ProcessedStore {
    /// Creates a store that is never written to disk.
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            path: None,
            capacity,
            slots: DashMap::new(),
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Loads the history file, or starts empty if it does not exist.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Io`] - the file exists but cannot be read.
    /// - [`StoreError::Corrupt`] - the file is not a valid history.
    pub fn load(path: impl Into<PathBuf>, capacity: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let mut store = Self::in_memory(capacity);

        let loaded = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str::<Vec<ProcessedRecord>>(&contents).map_err(|source| {
                    StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    }
                })?
            }
        } else {
            Vec::new()
        };

        let total = loaded.len();
        // The last copy of a hash is the newest outcome.
        let mut seen = HashSet::new();
        let mut unique: Vec<ProcessedRecord> = loaded
            .into_iter()
            .rev()
            .filter(|record| seen.insert(record.hash.clone()))
            .take(capacity)
            .collect();
        unique.reverse();

        let kept = unique.len();
        {
            let records = store.records.get_mut();
            for record in unique {
                store
                    .slots
                    .insert(record.hash.clone(), Slot::Recorded(record.status));
                records.push_back(record);
            }
        }
        if kept < total {
            warn!(kept, total, "dropped duplicate or excess history records on load");
        }
        info!(path = %path.display(), records = kept, "loaded transaction history");

        store.path = Some(path);
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the hash has a recorded outcome or is being handled right now.
    pub fn is_processed(&self, hash: &TransactionHash) -> bool {
        self.slots.contains_key(hash)
    }

    /// Recorded outcome for the hash, if any.
    pub fn status(&self, hash: &TransactionHash) -> Option<ProcessingStatus> {
        match self.slots.get(hash).map(|slot| *slot) {
            Some(Slot::Recorded(status)) => Some(status),
            _ => None,
        }
    }

    /// Snapshot of the records, oldest first.
    pub fn records(&self) -> Vec<ProcessedRecord> {
        self.records.lock().iter().cloned().collect()
    }

    /// Atomically claims a hash for handling.
    ///
    /// Returns `None` if the hash is already recorded or reserved. The
    /// reservation is released when dropped without [`Reservation::commit`].
    pub fn reserve(self: &Arc<Self>, hash: &TransactionHash) -> Option<Reservation> {
        // Entry API keeps check-and-insert atomic.
        match self.slots.entry(hash.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(entry) => {
                entry.insert(Slot::Reserved);
                Some(Reservation {
                    store: Arc::clone(self),
                    hash: hash.clone(),
                    committed: false,
                })
            }
        }
    }

    /// Appends a record, prunes the oldest beyond capacity and flushes.
    ///
    /// A second record for an already recorded hash is ignored.
    pub fn record(&self, record: ProcessedRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock();

        let existing = self.slots.get(&record.hash).map(|slot| *slot);
        if let Some(Slot::Recorded(_)) = existing {
            debug!(hash = %record.hash, "outcome already recorded, ignoring");
            return Ok(());
        }

        self.slots
            .insert(record.hash.clone(), Slot::Recorded(record.status));
        records.push_back(record);

        while records.len() > self.capacity {
            if let Some(evicted) = records.pop_front() {
                self.slots
                    .remove_if(&evicted.hash, |_, slot| matches!(slot, Slot::Recorded(_)));
            }
        }

        self.write(&records)
    }

    /// Writes the current history to disk.
    pub fn persist(&self) -> Result<(), StoreError> {
        let records = self.records.lock();
        self.write(&records)
    }

    fn write(&self, records: &VecDeque<ProcessedRecord>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(records)?;

        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp).map_err(io_error)?;
        file.write_all(&json).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        fs::rename(&tmp, path).map_err(io_error)?;

        debug!(path = %path.display(), records = records.len(), "saved transaction history");
        Ok(())
    }

    fn release(&self, hash: &TransactionHash) {
        self.slots
            .remove_if(hash, |_, slot| *slot == Slot::Reserved);
    }
}

/// Exclusive claim on one transaction hash.
#[derive(Debug)]
pub struct Reservation {
    store: Arc<ProcessedStore>,
    hash: TransactionHash,
    committed: bool,
}

impl Reservation {
    pub fn hash(&self) -> &TransactionHash {
        &self.hash
    }

    /// Records the outcome, turning the reservation into a permanent entry.
    pub fn commit(mut self, record: ProcessedRecord) -> Result<(), StoreError> {
        debug_assert_eq!(record.hash, self.hash);
        self.store.record(record)?;
        self.committed = true;
        Ok(())
    }

    /// [`Self::commit`] on the blocking pool, for use from async tasks.
    pub async fn commit_in_background(self, record: ProcessedRecord) -> Result<(), StoreError> {
        tokio::task::spawn_blocking(move || self.commit(record))
            .await
            .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            self.store.release(&self.hash);
        }
    }
}
