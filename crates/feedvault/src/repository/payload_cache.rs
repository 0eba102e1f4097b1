/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! In-process cache of package payloads.
//!
//! The cache is never a source of truth: any entry may be evicted at any time
//! and a miss always falls through to the blob store.
//!
//! A reader that fills the cache after a miss first takes a [`generation`]
//! snapshot and inserts with [`insert_if_current`]. Any invalidation in
//! between bumps the generation, so bytes read before a replacing write
//! are never cached.
//!
//! [`generation`]: PayloadCache::generation
//! [`insert_if_current`]: PayloadCache::insert_if_current

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Cache key: package id plus normalized version.
pub type PayloadKey = (String, String);

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<PayloadKey, Arc<[u8]>>,
    // insertion order, oldest first
    order: VecDeque<PayloadKey>,
    // bumped by every invalidate and clear
    generation: u64,
}

/// Bounded FIFO payload cache shared by clones of a repository.
#[derive(Debug, Clone)]
pub struct PayloadCache {
    capacity: usize,
    inner: Arc<Mutex<Inner>>,
}

impl PayloadCache {
    /// A capacity of zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &PayloadKey) -> Option<Arc<[u8]>> {
        self.inner.lock().entries.get(key).cloned()
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn insert(&self, key: PayloadKey, payload: Arc<[u8]>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        Self::insert_locked(&mut inner, self.capacity, key, payload);
    }

    /// Inserts only when nothing was invalidated since `generation` was
    /// read. Returns whether the payload was cached.
    pub fn insert_if_current(&self, key: PayloadKey, payload: Arc<[u8]>, generation: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        Self::insert_locked(&mut inner, self.capacity, key, payload);
        true
    }

    fn insert_locked(inner: &mut Inner, capacity: usize, key: PayloadKey, payload: Arc<[u8]>) {
        if inner.entries.insert(key.clone(), payload).is_none() {
            inner.order.push_back(key);
        }
        while inner.entries.len() > capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn invalidate(&self, key: &PayloadKey) {
        let mut inner = self.inner.lock();
        inner.generation = inner.generation.wrapping_add(1);
        if inner.entries.remove(key).is_some() {
            inner.order.retain(|k| k != key);
        }
    }

    /// Drops every entry and returns how many were held.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.entries.len();
        inner.generation = inner.generation.wrapping_add(1);
        inner.entries.clear();
        inner.order.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
