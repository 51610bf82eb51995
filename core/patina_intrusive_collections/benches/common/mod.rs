//! Records, adapters and key generation shared by the benchmarks.
//!
//! ## License
//!
//! Copyright (C) Microsoft Corporation. All rights reserved.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![allow(dead_code)]
use patina_intrusive_collections::{Adapter, Avl, HashAdapter, HashLink, Link, RedBlack};
use rand::Rng;
use std::{
    cmp::Ordering,
    collections::{HashSet, hash_map::DefaultHasher},
    hash::{Hash, Hasher},
};
use uint::construct_uint;

pub const MAX_SIZE: usize = 4096;

// The size of MemorySpaceDescriptor
construct_uint! {
    pub struct U384(6);
}

/// A key type the benchmarks can run with.
pub trait Key: Copy + Ord + Hash {}

impl<K: Copy + Ord + Hash> Key for K {}

/// A record linked into every collection under test at once.
pub struct Record<'a, K> {
    pub key: K,
    by_rbt: Link<'a, Record<'a, K>, RedBlack>,
    by_avl: Link<'a, Record<'a, K>, Avl>,
    by_hash: HashLink<'a, Record<'a, K>>,
}

impl<K: Key> Record<'_, K> {
    pub fn many(keys: &[K]) -> Vec<Self> {
        keys.iter()
            .map(|&key| Record { key, by_rbt: Link::new(), by_avl: Link::new(), by_hash: HashLink::new() })
            .collect()
    }
}

pub struct ByRbt;

impl<'a, K: 'a> Adapter<'a, Record<'a, K>> for ByRbt {
    type Balance = RedBlack;

    fn link<'s>(item: &'s Record<'a, K>) -> &'s Link<'a, Record<'a, K>, RedBlack> {
        &item.by_rbt
    }
}

pub struct ByAvl;

impl<'a, K: 'a> Adapter<'a, Record<'a, K>> for ByAvl {
    type Balance = Avl;

    fn link<'s>(item: &'s Record<'a, K>) -> &'s Link<'a, Record<'a, K>, Avl> {
        &item.by_avl
    }
}

pub struct ByHash;

impl<'a, K: 'a> HashAdapter<'a, Record<'a, K>> for ByHash {
    type Key = K;

    fn hash_link<'s>(item: &'s Record<'a, K>) -> &'s HashLink<'a, Record<'a, K>> {
        &item.by_hash
    }

    fn key<'s>(item: &'s Record<'a, K>) -> &'s K {
        &item.key
    }
}

pub fn by_key<K: Ord>(a: &Record<'_, K>, b: &Record<'_, K>) -> Ordering {
    a.key.cmp(&b.key)
}

pub fn hash_key<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

pub fn random_numbers<D>(min: D, max: D) -> Vec<D>
where
    D: Copy + Eq + std::cmp::PartialOrd + Hash + rand::distributions::uniform::SampleUniform,
{
    let mut rng = rand::thread_rng();
    let mut nums: HashSet<D> = HashSet::new();
    while nums.len() < MAX_SIZE {
        let num: D = rng.gen_range(min..=max);
        nums.insert(num);
    }
    nums.into_iter().collect()
}
