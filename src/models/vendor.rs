//! Vendor model messages. The stack doesn't know their layout so parameters are kept raw and
//! matched by company id only.
use crate::access::Opcode;
use crate::mesh::CompanyID;

#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct VendorStatus {
    pub opcode: Opcode,
    pub parameters: Vec<u8>,
}
impl VendorStatus {
    /// `Some` if `opcode` is a vendor opcode (of `company_id` if given).
    #[must_use]
    pub fn parse(
        opcode: Opcode,
        company_id: Option<CompanyID>,
        parameters: &[u8],
    ) -> Option<VendorStatus> {
        let cid = opcode.company_id()?;
        if company_id.map_or(true, |expected| expected == cid) {
            Some(VendorStatus {
                opcode,
                parameters: parameters.to_vec(),
            })
        } else {
            None
        }
    }
    #[must_use]
    pub fn company_id(&self) -> Option<CompanyID> {
        self.opcode.company_id()
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_match() {
        let opcode = Opcode::vendor(0x01, CompanyID(0x0059));
        assert!(VendorStatus::parse(opcode, Some(CompanyID(0x0059)), &[1, 2]).is_some());
        assert!(VendorStatus::parse(opcode, Some(CompanyID(0x0001)), &[1, 2]).is_none());
        assert_eq!(
            VendorStatus::parse(opcode, None, &[1, 2]).unwrap().parameters,
            vec![1, 2]
        );
        assert!(VendorStatus::parse(Opcode::sig(0x8204).unwrap(), None, &[]).is_none());
    }
}
