//! Replay Cache based on a BTreeMap that keeps track of the last `(IVIndex, SequenceNumber)` per
//! src address. A PDU is only accepted if its `(IVIndex, SequenceNumber)` is strictly newer.
//! The cache is stored in the directory (and its JSON with `serde-1`) so the check survives a
//! restart. A source with no entry has never been heard from.
use crate::address::UnicastAddress;
use crate::mesh::{IVIndex, SequenceNumber};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct CacheEntry {
    iv_index: IVIndex,
    seq: SequenceNumber,
}
impl CacheEntry {
    #[must_use]
    pub fn new(iv_index: IVIndex, seq: SequenceNumber) -> Self {
        Self { iv_index, seq }
    }
    /// `true` if `(iv_index, seq)` is NOT newer than this entry.
    #[must_use]
    pub fn is_old(&self, iv_index: IVIndex, seq: SequenceNumber) -> bool {
        (iv_index, seq) <= (self.iv_index, self.seq)
    }
    #[must_use]
    pub fn seq(&self) -> SequenceNumber {
        self.seq
    }
    #[must_use]
    pub fn iv_index(&self) -> IVIndex {
        self.iv_index
    }
}
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash, Default)]
pub struct Cache {
    map: BTreeMap<UnicastAddress, CacheEntry>,
}
impl Cache {
    #[must_use]
    pub fn new() -> Cache {
        Cache::default()
    }
    #[must_use]
    pub fn get_entry(&self, address: UnicastAddress) -> Option<&CacheEntry> {
        self.map.get(&address)
    }
    #[must_use]
    pub fn is_old(&self, src: UnicastAddress, iv_index: IVIndex, seq: SequenceNumber) -> bool {
        self.get_entry(src)
            .map_or(false, |entry| entry.is_old(iv_index, seq))
    }
    /// Returns `true` if the header is old or `false` if the header is new and valid.
    /// New headers are recorded. If no information about the source of the PDU is known, it
    /// records the header and returns `false`.
    pub fn replay_check(
        &mut self,
        src: UnicastAddress,
        iv_index: IVIndex,
        seq: SequenceNumber,
    ) -> bool {
        match self.map.entry(src) {
            Entry::Vacant(v) => {
                v.insert(CacheEntry::new(iv_index, seq));
                false
            }
            Entry::Occupied(mut o) => {
                if o.get().is_old(iv_index, seq) {
                    true
                } else {
                    o.insert(CacheEntry::new(iv_index, seq));
                    false
                }
            }
        }
    }
    pub fn remove(&mut self, src: UnicastAddress) -> Option<CacheEntry> {
        self.map.remove(&src)
    }
}
