//! Collection of security materials (Keys, NID, AID, etc) used for encryption and decryption.
//! Derived values (`k2`, `k3`, `k4` outputs) are computed once when a key is inserted and cached
//! next to the key instead of being rederived for every PDU.
use crate::crypto::key::{AppKey, EncryptionKey, NetKey, PrivacyKey};
use crate::crypto::{k2, NetworkID, AID};
use crate::mesh::{AppKeyIndex, NetKeyIndex, NID};
use std::collections::btree_map;

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct NetworkKeys {
    nid: NID,
    encryption: EncryptionKey,
    privacy: PrivacyKey,
}

impl NetworkKeys {
    #[must_use]
    pub fn new(nid: NID, encryption: EncryptionKey, privacy: PrivacyKey) -> Self {
        Self {
            nid,
            encryption,
            privacy,
        }
    }
    #[must_use]
    pub fn nid(&self) -> NID {
        self.nid
    }
    #[must_use]
    pub fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption
    }
    #[must_use]
    pub fn privacy_key(&self) -> &PrivacyKey {
        &self.privacy
    }
}
impl From<&NetKey> for NetworkKeys {
    fn from(k: &NetKey) -> Self {
        let (nid, encryption, privacy) = k2(k.key(), b"\x00");
        Self::new(nid, encryption, privacy)
    }
}
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct NetworkSecurityMaterials {
    net_key_index: NetKeyIndex,
    net_key: NetKey,
    network_keys: NetworkKeys,
}
impl NetworkSecurityMaterials {
    #[must_use]
    pub fn new(net_key_index: NetKeyIndex, net_key: NetKey) -> Self {
        Self {
            net_key_index,
            net_key,
            network_keys: (&net_key).into(),
        }
    }
    #[must_use]
    pub fn net_key_index(&self) -> NetKeyIndex {
        self.net_key_index
    }
    #[must_use]
    pub fn net_key(&self) -> &NetKey {
        &self.net_key
    }
    #[must_use]
    pub fn network_keys(&self) -> &NetworkKeys {
        &self.network_keys
    }
    #[must_use]
    pub fn network_id(&self) -> NetworkID {
        (&self.net_key).into()
    }
}

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NetKeyMap {
    map: btree_map::BTreeMap<NetKeyIndex, NetworkSecurityMaterials>,
}
impl NetKeyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Inserts (or replaces) the key at `index` and caches its `k2` derived materials.
    pub fn insert(&mut self, index: NetKeyIndex, net_key: NetKey) -> &NetworkSecurityMaterials {
        self.map
            .insert(index, NetworkSecurityMaterials::new(index, net_key));
        &self.map[&index]
    }

    /// Returns all `NetworkSecurityMaterials` matching `nid_to_match`. Because `NID` is a 7-bit value,
    /// one `NID` can match multiple different networks. For this reason, this functions returns an
    /// iterator that yields each matching network security materials (lowest index first). Only
    /// attempting to decrypt the Network PDU (and it failing/succeeding) will tell you if the
    /// `NID` and `NetworkKeys` match.
    pub fn matching_nid(
        &self,
        nid_to_match: NID,
    ) -> impl Iterator<Item = &'_ NetworkSecurityMaterials> {
        self.map
            .values()
            .filter(move |materials| materials.network_keys.nid == nid_to_match)
    }
    #[must_use]
    pub fn get_keys(&self, index: NetKeyIndex) -> Option<&NetworkSecurityMaterials> {
        self.map.get(&index)
    }
    pub fn remove_keys(&mut self, index: NetKeyIndex) -> Option<NetworkSecurityMaterials> {
        self.map.remove(&index)
    }
    pub fn iter(&self) -> impl Iterator<Item = &'_ NetworkSecurityMaterials> {
        self.map.values()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct ApplicationSecurityMaterials {
    pub app_key_index: AppKeyIndex,
    pub app_key: AppKey,
    pub aid: AID,
    pub net_key_index: NetKeyIndex,
}
impl ApplicationSecurityMaterials {
    #[must_use]
    pub fn new(app_key_index: AppKeyIndex, app_key: AppKey, net_key_index: NetKeyIndex) -> Self {
        Self {
            app_key_index,
            app_key,
            aid: app_key.aid(),
            net_key_index,
        }
    }
}
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AppKeyMap {
    map: btree_map::BTreeMap<AppKeyIndex, ApplicationSecurityMaterials>,
}
impl AppKeyMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Inserts (or replaces) the key at `index` bound to `net_key_index` and caches its `AID`.
    pub fn insert(
        &mut self,
        index: AppKeyIndex,
        app_key: AppKey,
        net_key_index: NetKeyIndex,
    ) -> &ApplicationSecurityMaterials {
        self.map.insert(
            index,
            ApplicationSecurityMaterials::new(index, app_key, net_key_index),
        );
        &self.map[&index]
    }
    #[must_use]
    pub fn get_key(&self, index: AppKeyIndex) -> Option<&ApplicationSecurityMaterials> {
        self.map.get(&index)
    }
    pub fn remove_key(&mut self, index: AppKeyIndex) -> Option<ApplicationSecurityMaterials> {
        self.map.remove(&index)
    }
    /// Every application key bound to `net_key_index`.
    pub fn bound_to(
        &self,
        net_key_index: NetKeyIndex,
    ) -> impl Iterator<Item = &'_ ApplicationSecurityMaterials> {
        self.map
            .values()
            .filter(move |materials| materials.net_key_index == net_key_index)
    }
}
