// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! # **Hash Table Kernels** - *Open-addressing tables keyed per algorithm dtype*
//!
//! A single open-addressing table, generic over [`HashKey`], backs every hashed
//! algorithm: `factorize`, `unique`, `match`, `isin`, `value_counts`,
//! `duplicated` and `mode`.
//!
//! ## Layout
//! - Slot array sized to a power of two, linear probing, doubled whenever the
//!   load would exceed `HASH_TABLE_MAX_LOAD`.
//! - Slots hold `entry ordinal + 1`; zero marks an empty slot.
//! - Missing keys never enter the slot array. A side flag records whether a
//!   missing key was seen and the value stored for it, so NaN is never hashed.
//!
//! Missing-ness of slot `i` is `!mask.get(i) || key.is_na()`.

use std::hash::{BuildHasher, Hasher};

use log::trace;
use minarrow::{Bitmask, Vec64};

use crate::config::{HASH_TABLE_MAX_LOAD, HASH_TABLE_MIN_CAPACITY};
use crate::operators::Keep;
use crate::traits::hash_key::HashKey;
use crate::values::Column;

#[cfg(feature = "fast_hash")]
type KeyHasher = ahash::RandomState;
#[cfg(not(feature = "fast_hash"))]
type KeyHasher = std::hash::BuildHasherDefault<std::collections::hash_map::DefaultHasher>;

/// Fixed-seed hasher so table layout never depends on process state.
#[inline]
fn key_hasher() -> KeyHasher {
    #[cfg(feature = "fast_hash")]
    {
        ahash::RandomState::with_seeds(
            0x243f_6a88_85a3_08d3,
            0x1319_8a2e_0370_7344,
            0xa409_3822_299f_31d0,
            0x082e_fa98_ec4e_6c89,
        )
    }
    #[cfg(not(feature = "fast_hash"))]
    {
        KeyHasher::default()
    }
}

#[inline(always)]
fn slot_is_na<K: HashKey>(data: &[K], mask: Option<&Bitmask>, i: usize) -> bool {
    mask.map_or(false, |m| !m.get(i)) || data[i].is_na()
}

/// Slot count for `n` entries under the load limit.
#[inline]
fn slots_for(n: usize) -> usize {
    let (num, den) = HASH_TABLE_MAX_LOAD;
    (n.max(HASH_TABLE_MIN_CAPACITY) * den)
        .div_ceil(num)
        .next_power_of_two()
}

/// Append-only buffer of unique keys in first-seen order.
///
/// At most one slot holds the missing value; `na_pos` records where.
#[derive(Debug, Clone)]
pub struct UniqueVector<K> {
    data: Vec64<K>,
    na_pos: Option<usize>,
}

impl<K: HashKey> UniqueVector<K> {
    pub fn new() -> Self {
        Self {
            data: Vec64::new(),
            na_pos: None,
        }
    }

    #[inline]
    pub fn push(&mut self, key: K) {
        self.data.push(key);
    }

    #[inline]
    pub fn push_na(&mut self) {
        self.na_pos = Some(self.data.len());
        self.data.push(K::na_value());
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn na_pos(&self) -> Option<usize> {
        self.na_pos
    }

    #[inline]
    pub fn as_slice(&self) -> &[K] {
        &self.data
    }

    /// Converts into a column, masking the missing slot if present.
    pub fn into_column(self) -> Column<K> {
        let null_mask = self.na_pos.map(|p| {
            let mut m = Bitmask::new_set_all(self.data.len(), true);
            m.set(p, false);
            m
        });
        Column::with_mask(self.data, null_mask)
    }
}

impl<K: HashKey> Default for UniqueVector<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Open-addressing map from key to an integer payload.
#[derive(Debug, Clone)]
pub struct HashTable<K: HashKey> {
    slots: Vec<usize>,
    keys: Vec<K>,
    hashes: Vec<u64>,
    values: Vec<usize>,
    na_value: Option<usize>,
    build: KeyHasher,
}

impl<K: HashKey> HashTable<K> {
    /// Creates a table able to hold `size_hint` keys without resizing.
    pub fn with_capacity(size_hint: usize) -> Self {
        Self {
            slots: vec![0; slots_for(size_hint)],
            keys: Vec::with_capacity(size_hint),
            hashes: Vec::with_capacity(size_hint),
            values: Vec::with_capacity(size_hint),
            na_value: None,
            build: key_hasher(),
        }
    }

    /// Number of distinct keys, counting the missing key once.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len() + self.na_value.is_some() as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current slot count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline(always)]
    fn hash_of(&self, key: &K) -> u64 {
        let mut h = self.build.build_hasher();
        key.hash_key(&mut h);
        h.finish()
    }

    /// Probes for `key`. `Ok(entry)` when present, `Err(slot)` with the
    /// first empty slot otherwise.
    #[inline]
    fn probe(&self, key: &K, hash: u64) -> Result<usize, usize> {
        let mask = self.slots.len() - 1;
        let mut pos = (hash as usize) & mask;
        loop {
            match self.slots[pos] {
                0 => return Err(pos),
                s => {
                    let entry = s - 1;
                    if self.hashes[entry] == hash && self.keys[entry].key_eq(key) {
                        return Ok(entry);
                    }
                }
            }
            pos = (pos + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let new_len = self.slots.len() * 2;
        trace!(
            "hash table resize: {} -> {} slots ({} keys)",
            self.slots.len(),
            new_len,
            self.keys.len()
        );
        let mut slots = vec![0usize; new_len];
        let mask = new_len - 1;
        for (entry, &h) in self.hashes.iter().enumerate() {
            let mut pos = (h as usize) & mask;
            while slots[pos] != 0 {
                pos = (pos + 1) & mask;
            }
            slots[pos] = entry + 1;
        }
        self.slots = slots;
    }

    #[inline]
    fn needs_grow(&self) -> bool {
        let (num, den) = HASH_TABLE_MAX_LOAD;
        (self.keys.len() + 1) * den > self.slots.len() * num
    }

    /// Payload stored for `key`, if present.
    #[inline]
    pub fn get(&self, key: &K) -> Option<usize> {
        let h = self.hash_of(key);
        self.probe(key, h).ok().map(|e| self.values[e])
    }

    /// Inserts or overwrites the payload for `key`.
    pub fn insert(&mut self, key: K, value: usize) {
        let h = self.hash_of(&key);
        match self.probe(&key, h) {
            Ok(entry) => self.values[entry] = value,
            Err(_) => {
                self.push_new(key, h, value);
            }
        }
    }

    /// Returns the existing payload for `key`, or inserts `value` and returns
    /// it with `true`.
    #[inline]
    pub fn get_or_insert(&mut self, key: &K, value: usize) -> (usize, bool) {
        let h = self.hash_of(key);
        match self.probe(key, h) {
            Ok(entry) => (self.values[entry], false),
            Err(_) => {
                self.push_new(key.clone(), h, value);
                (value, true)
            }
        }
    }

    fn push_new(&mut self, key: K, hash: u64, value: usize) {
        if self.needs_grow() {
            self.grow();
        }
        // Re-probe after a possible resize.
        let slot = match self.probe(&key, hash) {
            Ok(_) => return,
            Err(slot) => slot,
        };
        self.keys.push(key);
        self.hashes.push(hash);
        self.values.push(value);
        self.slots[slot] = self.keys.len();
    }

    #[inline]
    pub fn get_na(&self) -> Option<usize> {
        self.na_value
    }

    #[inline]
    pub fn set_na(&mut self, value: usize) {
        self.na_value = Some(value);
    }

    /// Inserts each key with its ordinal position. Later duplicates overwrite,
    /// so the table ends up holding the last position of every key.
    pub fn map_locations(&mut self, data: &[K], mask: Option<&Bitmask>) {
        for i in 0..data.len() {
            if slot_is_na(data, mask, i) {
                self.set_na(i);
            } else {
                self.insert(data[i].clone(), i);
            }
        }
    }

    /// Position stored for each key, or −1 when absent.
    pub fn lookup(&self, data: &[K], mask: Option<&Bitmask>) -> Vec64<i64> {
        let mut out = Vec64::with_capacity(data.len());
        for i in 0..data.len() {
            let hit = if slot_is_na(data, mask, i) {
                self.na_value
            } else {
                self.get(&data[i])
            };
            out.push(hit.map_or(-1, |p| p as i64));
        }
        out
    }

    /// First-occurrence unique keys. The missing key, if any, appears once at
    /// the position it was first seen.
    pub fn unique(&mut self, data: &[K], mask: Option<&Bitmask>) -> UniqueVector<K> {
        let mut uniques = UniqueVector::new();
        for i in 0..data.len() {
            if slot_is_na(data, mask, i) {
                if self.na_value.is_none() {
                    self.set_na(uniques.len());
                    uniques.push_na();
                }
                continue;
            }
            let (_, inserted) = self.get_or_insert(&data[i], uniques.len());
            if inserted {
                uniques.push(data[i].clone());
            }
        }
        uniques
    }

    /// Factorizes `data` into labels, appending newly seen keys to `uniques`.
    ///
    /// Labels start at `count_prior`. With `check_nulls`, missing keys receive
    /// `na_sentinel` and never enter `uniques`; without it the missing key gets
    /// its own label like any other value.
    pub fn get_labels(
        &mut self,
        data: &[K],
        mask: Option<&Bitmask>,
        uniques: &mut UniqueVector<K>,
        count_prior: usize,
        na_sentinel: i64,
        check_nulls: bool,
    ) -> Vec64<i64> {
        let mut labels = Vec64::with_capacity(data.len());
        let mut count = count_prior;
        for i in 0..data.len() {
            if slot_is_na(data, mask, i) {
                if check_nulls {
                    labels.push(na_sentinel);
                    continue;
                }
                let label = match self.na_value {
                    Some(l) => l,
                    None => {
                        self.set_na(count);
                        uniques.push_na();
                        count += 1;
                        count - 1
                    }
                };
                labels.push(label as i64);
                continue;
            }
            let (label, inserted) = self.get_or_insert(&data[i], count);
            if inserted {
                uniques.push(data[i].clone());
                count += 1;
            }
            labels.push(label as i64);
        }
        labels
    }
}

/// Hash-aggregated counts in first-seen key order.
///
/// With `dropna = false` and at least one missing key, the missing key is
/// placed first.
pub fn value_count<K: HashKey>(
    data: &[K],
    mask: Option<&Bitmask>,
    dropna: bool,
) -> (UniqueVector<K>, Vec64<i64>) {
    let mut table = HashTable::<K>::with_capacity(data.len());
    let mut keys: Vec64<K> = Vec64::new();
    let mut counts: Vec64<i64> = Vec64::new();
    let mut na_count = 0i64;
    for i in 0..data.len() {
        if slot_is_na(data, mask, i) {
            na_count += 1;
            continue;
        }
        let (idx, inserted) = table.get_or_insert(&data[i], keys.len());
        if inserted {
            keys.push(data[i].clone());
            counts.push(1);
        } else {
            counts[idx] += 1;
        }
    }

    let mut out_keys = UniqueVector::new();
    let mut out_counts = Vec64::with_capacity(counts.len() + 1);
    if !dropna && na_count > 0 {
        out_keys.push_na();
        out_counts.push(na_count);
    }
    for (k, &c) in keys.iter().zip(counts.iter()) {
        out_keys.push(k.clone());
        out_counts.push(c);
    }
    (out_keys, out_counts)
}

/// Marks duplicate occurrences. `keep` decides which occurrence stays unmarked;
/// with `Keep::Neither` every member of a repeated group is marked.
pub fn duplicated<K: HashKey>(data: &[K], mask: Option<&Bitmask>, keep: Keep) -> Vec64<bool> {
    let n = data.len();
    let mut out = vec![false; n];
    let mut table = HashTable::<K>::with_capacity(n);
    match keep {
        Keep::First | Keep::Last => {
            let mut na_seen = false;
            let order: Box<dyn Iterator<Item = usize>> = if keep == Keep::First {
                Box::new(0..n)
            } else {
                Box::new((0..n).rev())
            };
            for i in order {
                if slot_is_na(data, mask, i) {
                    out[i] = na_seen;
                    na_seen = true;
                } else {
                    let (_, inserted) = table.get_or_insert(&data[i], i);
                    out[i] = !inserted;
                }
            }
        }
        Keep::Neither => {
            let mut first_na: Option<usize> = None;
            for i in 0..n {
                if slot_is_na(data, mask, i) {
                    match first_na {
                        Some(f) => {
                            out[f] = true;
                            out[i] = true;
                        }
                        None => first_na = Some(i),
                    }
                } else {
                    let (first, inserted) = table.get_or_insert(&data[i], i);
                    if !inserted {
                        out[first] = true;
                        out[i] = true;
                    }
                }
            }
        }
    }
    out.into_iter().collect()
}

/// Every non-missing key whose count equals the maximum count, in first-seen
/// order. Empty input yields an empty result.
pub fn mode<K: HashKey>(data: &[K], mask: Option<&Bitmask>) -> UniqueVector<K> {
    let (keys, counts) = value_count(data, mask, true);
    let mut out = UniqueVector::new();
    let Some(&max) = counts.iter().max() else {
        return out;
    };
    for (k, &c) in keys.as_slice().iter().zip(counts.iter()) {
        if c == max {
            out.push(k.clone());
        }
    }
    out
}

/// Membership of each key of `data` in `haystack`. Missing keys match
/// missing keys.
pub fn ismember<K: HashKey>(
    data: &[K],
    mask: Option<&Bitmask>,
    haystack: &[K],
    haystack_mask: Option<&Bitmask>,
) -> Vec64<bool> {
    let mut table = HashTable::<K>::with_capacity(haystack.len());
    let mut na_present = false;
    for i in 0..haystack.len() {
        if slot_is_na(haystack, haystack_mask, i) {
            na_present = true;
        } else {
            table.get_or_insert(&haystack[i], i);
        }
    }
    (0..data.len())
        .map(|i| {
            if slot_is_na(data, mask, i) {
                na_present
            } else {
                table.get(&data[i]).is_some()
            }
        })
        .collect()
}
