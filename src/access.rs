//! Access Layer between Models and the rest of the stack (Transport, Network, etc). The most
//! surface layer of the stack. An Access PDU is just `Opcode || Parameters`.
use crate::bytes::ToFromBytesEndian;
use crate::mesh::CompanyID;
use core::fmt::{Display, Formatter};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum SigOpcode {
    SingleOctet(u8),
    DoubleOctet(u16),
}
impl SigOpcode {
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            SigOpcode::SingleOctet(_) => 1,
            SigOpcode::DoubleOctet(_) => 2,
        }
    }
}
impl From<SigOpcode> for Opcode {
    fn from(opcode: SigOpcode) -> Self {
        Opcode::SIG(opcode)
    }
}
const VENDOR_OPCODE_MAX: u8 = (1_u8 << 6) - 1;
/// 6 bit Vendor Opcode
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct VendorOpcode(u8);
impl VendorOpcode {
    /// # Panics
    /// Panics if `opcode > 0x3F`.
    #[must_use]
    pub fn new(opcode: u8) -> Self {
        assert!(opcode <= VENDOR_OPCODE_MAX, "vendor opcode overflow");
        VendorOpcode(opcode)
    }
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct OpcodeConversationError(pub ());
impl Display for OpcodeConversationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str("invalid or RFU opcode")
    }
}
impl std::error::Error for OpcodeConversationError {}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    SIG(SigOpcode),
    Vendor(VendorOpcode, CompanyID),
}
impl Opcode {
    /// Shorthand for a 1 or 2 octet SIG opcode written as a number (`0x02`, `0x8003`).
    /// Returns `None` for numbers that aren't valid SIG opcodes.
    #[must_use]
    pub fn sig(opcode: u16) -> Option<Opcode> {
        if opcode <= 0x7E {
            Some(Opcode::SIG(SigOpcode::SingleOctet(opcode as u8)))
        } else if opcode & 0xC000 == 0x8000 {
            Some(Opcode::SIG(SigOpcode::DoubleOctet(opcode)))
        } else {
            None
        }
    }
    #[must_use]
    pub fn vendor(opcode: u8, company_id: CompanyID) -> Opcode {
        Opcode::Vendor(VendorOpcode::new(opcode & VENDOR_OPCODE_MAX), company_id)
    }
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyID> {
        match self {
            Opcode::Vendor(_, cid) => Some(*cid),
            Opcode::SIG(_) => None,
        }
    }
    #[must_use]
    pub fn is_sig(&self) -> bool {
        self.company_id().is_none()
    }
    #[must_use]
    pub fn is_vendor(&self) -> bool {
        !self.is_sig()
    }
    #[must_use]
    pub fn byte_len(&self) -> usize {
        match self {
            Opcode::SIG(o) => o.byte_len(),
            Opcode::Vendor(_, _) => 3,
        }
    }
    /// Reads the opcode off the front of `bytes`. The opcode length comes from the top two bits
    /// of the first octet (`0x` → 1, `10` → 2, `11` → 3). Trailing bytes are ignored.
    pub fn unpack_from(bytes: &[u8]) -> Result<Self, OpcodeConversationError> {
        let first = *bytes.first().ok_or(OpcodeConversationError(()))?;
        if first == 0x7F {
            // This opcode is RFU
            Err(OpcodeConversationError(()))
        } else if first & 0x80 == 0 {
            Ok(Opcode::SIG(SigOpcode::SingleOctet(first)))
        } else if first & 0xC0 == 0xC0 {
            if bytes.len() < 3 {
                return Err(OpcodeConversationError(()));
            }
            let vendor_opcode = VendorOpcode::new(first & VENDOR_OPCODE_MAX);
            let company_id =
                CompanyID::from_bytes_le(&bytes[1..3]).ok_or(OpcodeConversationError(()))?;
            Ok(Opcode::Vendor(vendor_opcode, company_id))
        } else {
            if bytes.len() < 2 {
                return Err(OpcodeConversationError(()));
            }
            Ok(Opcode::SIG(SigOpcode::DoubleOctet(u16::from_be_bytes([
                bytes[0], bytes[1],
            ]))))
        }
    }
    pub fn pack_into(&self, buffer: &mut [u8]) -> Result<(), OpcodeConversationError> {
        if buffer.len() < self.byte_len() {
            return Err(OpcodeConversationError(()));
        }
        match *self {
            Opcode::SIG(SigOpcode::SingleOctet(s)) => {
                if s & 0x80 == 0 && s != 0x7F {
                    buffer[0] = s;
                    Ok(())
                } else {
                    Err(OpcodeConversationError(()))
                }
            }
            Opcode::SIG(SigOpcode::DoubleOctet(d)) => {
                if d & 0xC000 == 0x8000 {
                    buffer[..2].copy_from_slice(&d.to_be_bytes()[..]);
                    Ok(())
                } else {
                    Err(OpcodeConversationError(()))
                }
            }
            Opcode::Vendor(opcode, company_id) => {
                buffer[0] = opcode.0 | 0xC0;
                buffer[1..3].copy_from_slice(&company_id.to_bytes_le()[..]);
                Ok(())
            }
        }
    }
}
impl Display for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Opcode::SIG(SigOpcode::SingleOctet(s)) => write!(f, "0x{:02X}", s),
            Opcode::SIG(SigOpcode::DoubleOctet(d)) => write!(f, "0x{:04X}", d),
            Opcode::Vendor(o, cid) => write!(f, "0x{:02X}(company 0x{:04X})", o.0 | 0xC0, cid.0),
        }
    }
}
/// Builds the Access PDU `opcode || parameters`.
pub fn encode(opcode: Opcode, parameters: &[u8]) -> Result<Vec<u8>, OpcodeConversationError> {
    let opcode_len = opcode.byte_len();
    let mut out = vec![0_u8; opcode_len + parameters.len()];
    opcode.pack_into(&mut out[..opcode_len])?;
    out[opcode_len..].copy_from_slice(parameters);
    Ok(out)
}
/// Splits an Access PDU into its `Opcode` and parameters.
pub fn decode(pdu: &[u8]) -> Result<(Opcode, &[u8]), OpcodeConversationError> {
    let opcode = Opcode::unpack_from(pdu)?;
    Ok((opcode, &pdu[opcode.byte_len()..]))
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_octet() {
        let pdu = encode(Opcode::sig(0x02).unwrap(), &[0xAA]).unwrap();
        assert_eq!(pdu, vec![0x02, 0xAA]);
        assert_eq!(decode(&pdu).unwrap(), (Opcode::sig(0x02).unwrap(), &[0xAA][..]));
    }
    #[test]
    fn test_double_octet_is_big_endian() {
        let opcode = Opcode::sig(0x8003).unwrap();
        let pdu = encode(opcode, &[1, 2, 3]).unwrap();
        assert_eq!(pdu, vec![0x80, 0x03, 1, 2, 3]);
        assert_eq!(decode(&pdu).unwrap(), (opcode, &[1, 2, 3][..]));
    }
    #[test]
    fn test_vendor_company_little_endian() {
        let opcode = Opcode::vendor(0x01, CompanyID(0x0059));
        let pdu = encode(opcode, &[]).unwrap();
        assert_eq!(pdu, vec![0xC1, 0x59, 0x00]);
        let (back, params) = decode(&pdu).unwrap();
        assert_eq!(back.company_id(), Some(CompanyID(0x0059)));
        assert!(params.is_empty());
    }
    #[test]
    fn test_rfu_and_truncated() {
        assert!(decode(&[0x7F]).is_err());
        assert!(decode(&[]).is_err());
        assert!(decode(&[0x80]).is_err());
        assert!(decode(&[0xC0, 0x01]).is_err());
        assert!(Opcode::sig(0x7F).is_none());
        assert!(Opcode::sig(0xC001).is_none());
    }
}
