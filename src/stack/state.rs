//! Per-destination message state. Each state knows which status table a response is parsed
//! with and what a parsed status changes in the node directory.
use crate::access::Opcode;
use crate::address::UnicastAddress;
use crate::directory::{ModelBinding, NodeDirectory};
use crate::lower::BlockAck;
use crate::mesh::CompanyID;
use crate::models::config::ConfigOpcode;
use crate::models::vendor::VendorStatus;
use crate::models::{self, MeshStatus, MessagePackError, StatusTable};
use crate::stack::messages::{Message, MessageKind, OutgoingMessage};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum StateKind {
    NoOperation,
    Config,
    Generic,
    VendorModelAcked(CompanyID),
    VendorModelUnacked(CompanyID),
    ProxyConfig,
}
impl Default for StateKind {
    fn default() -> Self {
        StateKind::NoOperation
    }
}
impl StateKind {
    /// State an outgoing message puts its destination in.
    #[must_use]
    pub fn for_message(message: &OutgoingMessage) -> StateKind {
        let cid = message.company_id().unwrap_or(CompanyID(0));
        match message.kind {
            MessageKind::Config => StateKind::Config,
            MessageKind::Generic { .. } => StateKind::Generic,
            MessageKind::VendorAcked { .. } => StateKind::VendorModelAcked(cid),
            MessageKind::VendorUnacked { .. } => StateKind::VendorModelUnacked(cid),
            MessageKind::ProxyConfig => StateKind::ProxyConfig,
        }
    }
    fn tables(self) -> &'static [StatusTable] {
        match self {
            StateKind::NoOperation => &[models::config::STATUS_TABLE, models::generics::STATUS_TABLE],
            StateKind::Config => &[models::config::STATUS_TABLE],
            StateKind::Generic => &[models::generics::STATUS_TABLE],
            StateKind::VendorModelAcked(_) | StateKind::VendorModelUnacked(_) => &[],
            StateKind::ProxyConfig => &[models::proxy::STATUS_TABLE],
        }
    }
    /// Company ID vendor statuses have to match. `Some(None)` accepts any company.
    fn vendor_filter(self) -> Option<Option<CompanyID>> {
        match self {
            StateKind::NoOperation => Some(None),
            StateKind::VendorModelAcked(cid) | StateKind::VendorModelUnacked(cid) => Some(Some(cid)),
            _ => None,
        }
    }
    /// Parses a status with this state's tables. `None` if the opcode isn't expected here.
    #[must_use]
    pub fn parse_status(
        self,
        opcode: Opcode,
        parameters: &[u8],
    ) -> Option<Result<MeshStatus, MessagePackError>> {
        if let Some(parser) = self
            .tables()
            .iter()
            .find_map(|table| models::lookup(*table, opcode))
        {
            return Some(parser(parameters));
        }
        let company_id = self.vendor_filter()?;
        VendorStatus::parse(opcode, company_id, parameters).map(|status| Ok(status.into()))
    }
}
/// Segmented message waiting for its block acknowledgement.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PendingTransaction {
    pub message: Message,
    pub acked: BlockAck,
}
#[derive(Clone, Eq, PartialEq, Debug, Hash, Default)]
pub struct MessageState {
    pub kind: StateKind,
    /// Opcode of the last request sent to this address.
    pub last_opcode: Option<Opcode>,
    pub pending: Option<PendingTransaction>,
}
impl MessageState {
    #[must_use]
    pub fn new(kind: StateKind) -> Self {
        Self {
            kind,
            last_opcode: None,
            pending: None,
        }
    }
}
/// Writes what `status` (sent by `src`) says back into the directory.
pub fn apply_status<D: NodeDirectory>(
    directory: &mut D,
    src: UnicastAddress,
    status: &MeshStatus,
    last_opcode: Option<Opcode>,
) {
    if let MeshStatus::NodeReset(_) = status {
        directory.remove_node(src);
        return;
    }
    let node = match directory.provisioned_node_mut(src) {
        Some(node) => node,
        None => return,
    };
    match status {
        MeshStatus::AppKey(s) if s.status.is_success() => {
            if last_opcode == Some(ConfigOpcode::AppKeyDelete.opcode()) {
                node.remove_app_key(s.app_key_index);
            } else {
                node.add_app_key(s.app_key_index);
            }
        }
        MeshStatus::ModelApp(s) if s.status.is_success() => {
            let binding = ModelBinding {
                element_address: s.element_address,
                model_id: s.model_id,
                app_key_index: s.app_key_index,
            };
            if last_opcode == Some(ConfigOpcode::ModelAppUnbind.opcode()) {
                node.unbind_model(&binding);
            } else {
                node.bind_model(binding);
            }
        }
        MeshStatus::DefaultTTL(s) => node.set_default_ttl(s.0),
        MeshStatus::Relay(s) => node.set_relay(*s),
        MeshStatus::NetworkTransmit(s) => node.set_network_transmit(*s),
        MeshStatus::CompositionData(s) => node.set_composition(s.data.clone()),
        _ => (),
    }
}
