//! Key and node directory. Everything the stack needs to know about the network (keys, the local
//! node, peer nodes and their device keys, IV Index) lives behind [`NodeDirectory`]. The stack
//! writes sequence numbers and status-driven state back through the mutable accessors.
use crate::address::UnicastAddress;
use crate::crypto::key::{AppKey, DevKey, NetKey};
use crate::crypto::materials::{
    AppKeyMap, ApplicationSecurityMaterials, NetKeyMap, NetworkSecurityMaterials,
};
use crate::mesh::{AppKeyIndex, IVIndex, ModelID, NetKeyIndex, SequenceNumber, TTL};
use crate::models::config::{CompositionData, NetworkTransmitStatus, RelayStatus};
use crate::replay;
use std::collections::{BTreeMap, BTreeSet};

/// Default TTL used until a node reports its own.
pub const DEFAULT_TTL: u8 = 5;

/// An AppKey bound to one model of one element.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct ModelBinding {
    pub element_address: UnicastAddress,
    pub model_id: ModelID,
    pub app_key_index: AppKeyIndex,
}

#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ProvisionedNode {
    unicast_address: UnicastAddress,
    element_count: u8,
    device_key: DevKey,
    /// For the local node: next `SequenceNumber` to transmit with.
    /// For peers: last `SequenceNumber` received.
    sequence_number: SequenceNumber,
    default_ttl: TTL,
    app_keys: BTreeSet<AppKeyIndex>,
    model_bindings: BTreeSet<ModelBinding>,
    relay: Option<RelayStatus>,
    network_transmit: Option<NetworkTransmitStatus>,
    composition: Option<CompositionData>,
}
impl ProvisionedNode {
    #[must_use]
    pub fn new(unicast_address: UnicastAddress, element_count: u8, device_key: DevKey) -> Self {
        Self {
            unicast_address,
            element_count: element_count.max(1),
            device_key,
            sequence_number: SequenceNumber::default(),
            default_ttl: TTL::new(DEFAULT_TTL),
            app_keys: BTreeSet::new(),
            model_bindings: BTreeSet::new(),
            relay: None,
            network_transmit: None,
            composition: None,
        }
    }
    #[must_use]
    pub fn unicast_address(&self) -> UnicastAddress {
        self.unicast_address
    }
    #[must_use]
    pub fn element_count(&self) -> u8 {
        self.element_count
    }
    pub fn set_element_count(&mut self, element_count: u8) {
        self.element_count = element_count.max(1);
    }
    /// Returns `true` if `address` is one of this node's element addresses.
    #[must_use]
    pub fn owns_address(&self, address: UnicastAddress) -> bool {
        let start = self.unicast_address.value();
        let address = address.value();
        address >= start && u32::from(address) < u32::from(start) + u32::from(self.element_count)
    }
    #[must_use]
    pub fn device_key(&self) -> &DevKey {
        &self.device_key
    }
    #[must_use]
    pub fn sequence_number(&self) -> SequenceNumber {
        self.sequence_number
    }
    pub fn set_sequence_number(&mut self, seq: SequenceNumber) {
        self.sequence_number = seq;
    }
    /// Takes the current `SequenceNumber` and advances the counter. `None` once the 24 bit space
    /// is used up (the IV Index has to be updated first).
    pub fn next_sequence_number(&mut self) -> Option<SequenceNumber> {
        let seq = self.sequence_number;
        self.sequence_number = seq.next()?;
        Some(seq)
    }
    #[must_use]
    pub fn default_ttl(&self) -> TTL {
        self.default_ttl
    }
    pub fn set_default_ttl(&mut self, ttl: TTL) {
        self.default_ttl = ttl;
    }
    pub fn app_keys(&self) -> impl Iterator<Item = AppKeyIndex> + '_ {
        self.app_keys.iter().copied()
    }
    pub fn add_app_key(&mut self, index: AppKeyIndex) -> bool {
        self.app_keys.insert(index)
    }
    pub fn remove_app_key(&mut self, index: AppKeyIndex) -> bool {
        self.model_bindings.retain(|b| b.app_key_index != index);
        self.app_keys.remove(&index)
    }
    pub fn model_bindings(&self) -> impl Iterator<Item = &'_ ModelBinding> {
        self.model_bindings.iter()
    }
    pub fn bind_model(&mut self, binding: ModelBinding) -> bool {
        self.model_bindings.insert(binding)
    }
    pub fn unbind_model(&mut self, binding: &ModelBinding) -> bool {
        self.model_bindings.remove(binding)
    }
    #[must_use]
    pub fn relay(&self) -> Option<&RelayStatus> {
        self.relay.as_ref()
    }
    pub fn set_relay(&mut self, relay: RelayStatus) {
        self.relay = Some(relay);
    }
    #[must_use]
    pub fn network_transmit(&self) -> Option<&NetworkTransmitStatus> {
        self.network_transmit.as_ref()
    }
    pub fn set_network_transmit(&mut self, network_transmit: NetworkTransmitStatus) {
        self.network_transmit = Some(network_transmit);
    }
    #[must_use]
    pub fn composition(&self) -> Option<&CompositionData> {
        self.composition.as_ref()
    }
    pub fn set_composition(&mut self, composition: CompositionData) {
        if !composition.elements.is_empty() {
            self.set_element_count(composition.elements.len() as u8);
        }
        self.composition = Some(composition);
    }
}

pub trait NodeDirectory {
    /// Any node other than the local one.
    fn provisioned_node(&self, address: UnicastAddress) -> Option<&ProvisionedNode>;
    fn provisioned_node_mut(&mut self, address: UnicastAddress) -> Option<&mut ProvisionedNode>;
    fn remove_node(&mut self, address: UnicastAddress) -> Option<ProvisionedNode>;
    fn network_keys(&self) -> &NetKeyMap;
    /// Key used for transmitting when no other is selected (lowest index).
    fn primary_network_key(&self) -> Option<&NetworkSecurityMaterials> {
        self.network_keys().iter().next()
    }
    fn app_key_map(&self) -> &AppKeyMap;
    fn application_key(&self, index: AppKeyIndex) -> Option<&ApplicationSecurityMaterials> {
        self.app_key_map().get_key(index)
    }
    /// Application keys bound to `net_key_index`, in `AppKeyIndex` order.
    fn application_keys(&self, net_key_index: NetKeyIndex) -> Vec<&ApplicationSecurityMaterials> {
        self.app_key_map().bound_to(net_key_index).collect()
    }
    /// The local node.
    fn provisioner(&self) -> &ProvisionedNode;
    fn provisioner_mut(&mut self) -> &mut ProvisionedNode;
    fn iv_index(&self) -> IVIndex;
    /// Last `(IVIndex, SequenceNumber)` accepted from every source. Kept with the keys so a
    /// reloaded directory still rejects frames it already accepted.
    fn replay_cache(&self) -> &replay::Cache;
    fn replay_cache_mut(&mut self) -> &mut replay::Cache;
    /// Returns `true` if `address` belongs to the local node.
    fn is_local(&self, address: UnicastAddress) -> bool {
        self.provisioner().owns_address(address)
    }
}

/// In-memory `NodeDirectory`. Can be saved/loaded as JSON with the `serde-1` feature.
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MeshNetwork {
    iv_index: IVIndex,
    net_keys: NetKeyMap,
    app_keys: AppKeyMap,
    provisioner: ProvisionedNode,
    nodes: BTreeMap<UnicastAddress, ProvisionedNode>,
    #[cfg_attr(feature = "serde-1", serde(default))]
    replay: replay::Cache,
}
impl MeshNetwork {
    /// New network with a single NetKey at index 0.
    #[must_use]
    pub fn new(provisioner: ProvisionedNode, primary_net_key: NetKey, iv_index: IVIndex) -> Self {
        let mut net_keys = NetKeyMap::new();
        net_keys.insert(NetKeyIndex(0), primary_net_key);
        Self {
            iv_index,
            net_keys,
            app_keys: AppKeyMap::new(),
            provisioner,
            nodes: BTreeMap::new(),
            replay: replay::Cache::new(),
        }
    }
    pub fn set_iv_index(&mut self, iv_index: IVIndex) {
        self.iv_index = iv_index;
    }
    pub fn add_net_key(&mut self, index: NetKeyIndex, net_key: NetKey) -> &NetworkSecurityMaterials {
        self.net_keys.insert(index, net_key)
    }
    pub fn remove_net_key(&mut self, index: NetKeyIndex) -> Option<NetworkSecurityMaterials> {
        self.net_keys.remove_keys(index)
    }
    pub fn add_app_key(
        &mut self,
        index: AppKeyIndex,
        app_key: AppKey,
        net_key_index: NetKeyIndex,
    ) -> &ApplicationSecurityMaterials {
        self.app_keys.insert(index, app_key, net_key_index)
    }
    pub fn remove_app_key(&mut self, index: AppKeyIndex) -> Option<ApplicationSecurityMaterials> {
        self.app_keys.remove_key(index)
    }
    /// Adds (or replaces) a peer node. Returns the node it replaced.
    pub fn add_node(&mut self, node: ProvisionedNode) -> Option<ProvisionedNode> {
        self.nodes.insert(node.unicast_address(), node)
    }
    pub fn nodes(&self) -> impl Iterator<Item = &'_ ProvisionedNode> {
        self.nodes.values()
    }
}
impl NodeDirectory for MeshNetwork {
    fn provisioned_node(&self, address: UnicastAddress) -> Option<&ProvisionedNode> {
        self.nodes.get(&address)
    }

    fn provisioned_node_mut(&mut self, address: UnicastAddress) -> Option<&mut ProvisionedNode> {
        self.nodes.get_mut(&address)
    }

    fn remove_node(&mut self, address: UnicastAddress) -> Option<ProvisionedNode> {
        // A node provisioned again at this address starts over at sequence number 0.
        self.replay.remove(address);
        self.nodes.remove(&address)
    }

    fn network_keys(&self) -> &NetKeyMap {
        &self.net_keys
    }

    fn app_key_map(&self) -> &AppKeyMap {
        &self.app_keys
    }

    fn provisioner(&self) -> &ProvisionedNode {
        &self.provisioner
    }

    fn provisioner_mut(&mut self) -> &mut ProvisionedNode {
        &mut self.provisioner
    }

    fn iv_index(&self) -> IVIndex {
        self.iv_index
    }

    fn replay_cache(&self) -> &replay::Cache {
        &self.replay
    }

    fn replay_cache_mut(&mut self) -> &mut replay::Cache {
        &mut self.replay
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> MeshNetwork {
        let provisioner =
            ProvisionedNode::new(UnicastAddress::new(0x0001), 2, DevKey::new_bytes([1; 16]));
        let mut network = MeshNetwork::new(provisioner, NetKey::new_bytes([2; 16]), IVIndex(0));
        network.add_app_key(AppKeyIndex(0), AppKey::new_bytes([3; 16]), NetKeyIndex(0));
        network.add_app_key(AppKeyIndex(1), AppKey::new_bytes([4; 16]), NetKeyIndex(1));
        network.add_node(ProvisionedNode::new(
            UnicastAddress::new(0x0010),
            1,
            DevKey::new_bytes([5; 16]),
        ));
        network
    }
    #[test]
    fn test_sequence_numbers() {
        let mut network = network();
        let node = network.provisioner_mut();
        assert_eq!(node.next_sequence_number(), SequenceNumber::new(0));
        assert_eq!(node.next_sequence_number(), SequenceNumber::new(1));
        node.set_sequence_number(SequenceNumber::new(0x00FF_FFFF).unwrap());
        assert_eq!(node.next_sequence_number(), None);
        assert_eq!(node.sequence_number().value(), 0x00FF_FFFF);
    }
    #[test]
    fn test_lookups() {
        let mut network = network();
        assert!(network.is_local(UnicastAddress::new(0x0002)));
        assert!(!network.is_local(UnicastAddress::new(0x0003)));
        assert_eq!(
            network.primary_network_key().map(|k| k.net_key_index()),
            Some(NetKeyIndex(0))
        );
        assert_eq!(network.application_keys(NetKeyIndex(0)).len(), 1);
        assert!(network.application_key(AppKeyIndex(1)).is_some());
        let node = network
            .provisioned_node_mut(UnicastAddress::new(0x0010))
            .unwrap();
        node.add_app_key(AppKeyIndex(0));
        node.bind_model(ModelBinding {
            element_address: UnicastAddress::new(0x0010),
            model_id: ModelID::SIG(0x1000),
            app_key_index: AppKeyIndex(0),
        });
        assert!(node.remove_app_key(AppKeyIndex(0)));
        assert_eq!(node.model_bindings().count(), 0);
        assert!(network.remove_node(UnicastAddress::new(0x0010)).is_some());
        assert!(network.provisioned_node(UnicastAddress::new(0x0010)).is_none());
    }
    #[test]
    fn test_net_keys_and_iv_index() {
        let mut network = network();
        let nid = network
            .add_net_key(NetKeyIndex(1), NetKey::new_bytes([6; 16]))
            .network_keys()
            .nid();
        assert_eq!(network.network_keys().len(), 2);
        assert_eq!(
            network
                .network_keys()
                .matching_nid(nid)
                .map(|k| k.net_key_index())
                .last(),
            Some(NetKeyIndex(1))
        );
        assert!(network.remove_net_key(NetKeyIndex(1)).is_some());
        assert!(network.remove_net_key(NetKeyIndex(1)).is_none());
        assert_eq!(
            network.primary_network_key().map(|k| k.net_key_index()),
            Some(NetKeyIndex(0))
        );
        network.set_iv_index(IVIndex(5));
        assert_eq!(network.iv_index(), IVIndex(5));
    }
    #[test]
    fn test_replay_cache_kept_with_nodes() {
        let mut network = network();
        let peer = UnicastAddress::new(0x0010);
        let seq = SequenceNumber::new(0).unwrap();
        assert!(network.replay_cache().get_entry(peer).is_none());
        assert!(!network.replay_cache_mut().replay_check(peer, IVIndex(0), seq));
        let reloaded = network.clone();
        assert!(reloaded.replay_cache().is_old(peer, IVIndex(0), seq));

        network.remove_node(peer);
        assert!(network.replay_cache().get_entry(peer).is_none());
    }
    #[cfg(feature = "serde-1")]
    #[test]
    fn test_replay_cache_survives_json() {
        let mut network = network();
        let peer = UnicastAddress::new(0x0010);
        let seq = SequenceNumber::new(7).unwrap();
        network.replay_cache_mut().replay_check(peer, IVIndex(0), seq);
        let json = serde_json::to_string(&network).unwrap();
        let mut reloaded: MeshNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, network);
        assert!(reloaded.replay_cache_mut().replay_check(peer, IVIndex(0), seq));
    }
}
