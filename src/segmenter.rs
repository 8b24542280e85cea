//! Splits an Upper Transport PDU into Lower Transport PDUs.
use crate::control::ControlOpcode;
use crate::crypto::{AID, AKF};
use crate::lower::{
    self, SegN, SegO, SegmentHeader, SegmentedAccessPDU, SegmentedControlPDU, SeqZero,
    UnsegmentedAccessPDU, UnsegmentedControlPDU, SEG_MAX, SZMIC, UNSEGMENTED_ACCESS_PDU_LEN,
    UNSEGMENTED_CONTROL_PDU_LEN,
};
use crate::upper::seg_count;
use core::fmt::{Display, Formatter};

/// What the first octet of every lower PDU carries.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum LowerHeader {
    Access { akf: AKF, aid: AID, szmic: SZMIC },
    Control(ControlOpcode),
}
impl LowerHeader {
    #[must_use]
    pub fn max_seg_len(&self) -> usize {
        match self {
            LowerHeader::Access { .. } => SegmentedAccessPDU::max_seg_len(),
            LowerHeader::Control(_) => SegmentedControlPDU::max_seg_len(),
        }
    }
    #[must_use]
    pub fn max_unsegmented_len(&self) -> usize {
        match self {
            LowerHeader::Access { .. } => UNSEGMENTED_ACCESS_PDU_LEN,
            LowerHeader::Control(_) => UNSEGMENTED_CONTROL_PDU_LEN,
        }
    }
}
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum SegmentError {
    /// Empty upper PDU.
    Empty,
    /// Needs more than 32 segments.
    TooLong,
    /// Doesn't fit a single unsegmented PDU but segmenting wasn't allowed.
    TooLongUnsegmented,
}
impl Display for SegmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            SegmentError::Empty => f.write_str("empty upper transport pdu"),
            SegmentError::TooLong => f.write_str("upper transport pdu needs more than 32 segments"),
            SegmentError::TooLongUnsegmented => {
                f.write_str("upper transport pdu too long for an unsegmented pdu")
            }
        }
    }
}
impl std::error::Error for SegmentError {}

pub struct Segmenter<'a> {
    upper_pdu: &'a [u8],
    header: LowerHeader,
    seq_zero: SeqZero,
    seg_n: Option<SegN>,
}
impl<'a> Segmenter<'a> {
    /// `seq_zero` only matters for segmented PDUs. `force_segment` sends even a short PDU as a
    /// single segment (needed for acknowledged transfers).
    pub fn new(
        upper_pdu: &'a [u8],
        header: LowerHeader,
        seq_zero: SeqZero,
        force_segment: bool,
    ) -> Result<Self, SegmentError> {
        if upper_pdu.is_empty() {
            return Err(SegmentError::Empty);
        }
        let segmented = force_segment || upper_pdu.len() > header.max_unsegmented_len();
        let seg_n = if segmented {
            let count = seg_count(upper_pdu.len(), header.max_seg_len());
            if count > usize::from(SEG_MAX) + 1 {
                return Err(SegmentError::TooLong);
            }
            Some(SegN::new_masked((count - 1) as u8))
        } else {
            None
        };
        if let LowerHeader::Access { szmic, .. } = header {
            if szmic.0 && seg_n.is_none() {
                return Err(SegmentError::TooLongUnsegmented);
            }
        }
        Ok(Self {
            upper_pdu,
            header,
            seq_zero,
            seg_n,
        })
    }
    #[must_use]
    pub fn is_segmented(&self) -> bool {
        self.seg_n.is_some()
    }
    /// `None` for unsegmented PDUs.
    #[must_use]
    pub fn seg_n(&self) -> Option<SegN> {
        self.seg_n
    }
    #[must_use]
    pub fn seg_count(&self) -> usize {
        self.seg_n.map_or(1, SegN::seg_count)
    }
    fn seg_data(&self, seg_o: SegO) -> &'a [u8] {
        let max = self.header.max_seg_len();
        let start = usize::from(seg_o.value()) * max;
        let end = core::cmp::min(start + max, self.upper_pdu.len());
        &self.upper_pdu[start..end]
    }
    /// The lower PDU at index `seg_o`. Unsegmented PDUs only have index 0.
    #[must_use]
    pub fn pdu(&self, seg_o: SegO) -> Option<lower::PDU> {
        match self.seg_n {
            None => {
                if seg_o.value() != 0 {
                    return None;
                }
                Some(match self.header {
                    LowerHeader::Access { akf, aid, .. } => lower::PDU::UnsegmentedAccess(
                        UnsegmentedAccessPDU::new(akf, aid, self.upper_pdu),
                    ),
                    LowerHeader::Control(opcode) => lower::PDU::UnsegmentedControl(
                        UnsegmentedControlPDU::new(opcode, self.upper_pdu),
                    ),
                })
            }
            Some(seg_n) => {
                if seg_o.value() > seg_n.value() {
                    return None;
                }
                let data = self.seg_data(seg_o);
                Some(match self.header {
                    LowerHeader::Access { akf, aid, szmic } => {
                        lower::PDU::SegmentedAccess(SegmentedAccessPDU::new(
                            akf,
                            aid,
                            szmic,
                            self.seq_zero,
                            seg_o,
                            seg_n,
                            data,
                        ))
                    }
                    LowerHeader::Control(opcode) => {
                        lower::PDU::SegmentedControl(SegmentedControlPDU::new(
                            opcode,
                            SegmentHeader::new(false, self.seq_zero, seg_o, seg_n),
                            data,
                        ))
                    }
                })
            }
        }
    }
    /// Every lower PDU in segment order.
    pub fn pdus(&self) -> impl Iterator<Item = (SegO, lower::PDU)> + '_ {
        (0..self.seg_count())
            .map(|i| SegO::new_masked(i as u8))
            .filter_map(move |seg_o| Some((seg_o, self.pdu(seg_o)?)))
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    fn access_header() -> LowerHeader {
        LowerHeader::Access {
            akf: AKF(true),
            aid: AID::new(0x09),
            szmic: SZMIC(false),
        }
    }
    #[test]
    fn test_unsegmented() {
        let upper = [0x11_u8; 15];
        let segmenter = Segmenter::new(&upper, access_header(), SeqZero::new(0), false).unwrap();
        assert!(!segmenter.is_segmented());
        let pdus: Vec<_> = segmenter.pdus().collect();
        assert_eq!(pdus.len(), 1);
        assert!(!pdus[0].1.is_seg());
        assert_eq!(pdus[0].1.to_bytes().as_ref()[0], 0x49);
    }
    #[test]
    fn test_twenty_bytes_two_segments() {
        let upper: Vec<u8> = (0..20).collect();
        let segmenter = Segmenter::new(&upper, access_header(), SeqZero::new(5), false).unwrap();
        assert_eq!(segmenter.seg_n(), Some(SegN::new(1)));
        let pdus: Vec<_> = segmenter.pdus().map(|(_, p)| p.to_bytes()).collect();
        assert_eq!(pdus.len(), 2);
        assert_eq!(pdus[0].len(), 4 + 12);
        assert_eq!(pdus[1].len(), 4 + 8);
        assert_eq!(&pdus[1].as_ref()[4..], &upper[12..]);
        // SegN == 1 in every header
        for p in &pdus {
            assert_eq!(p.as_ref()[3] & 0x1F, 1);
        }
    }
    #[test]
    fn test_segment_counts() {
        for len in 16..=384 {
            let upper = vec![0_u8; len];
            let segmenter = Segmenter::new(&upper, access_header(), SeqZero::new(0), false).unwrap();
            assert_eq!(segmenter.seg_count(), (len + 11) / 12);
        }
        let upper = vec![0_u8; 385];
        assert_eq!(
            Segmenter::new(&upper, access_header(), SeqZero::new(0), false).err(),
            Some(SegmentError::TooLong)
        );
    }
    #[test]
    fn test_control_segments() {
        let params = [7_u8; 12];
        let segmenter = Segmenter::new(
            &params,
            LowerHeader::Control(ControlOpcode::Heartbeat),
            SeqZero::new(0),
            false,
        )
        .unwrap();
        assert_eq!(segmenter.seg_count(), 2);
        let forced = Segmenter::new(
            &params[..3],
            LowerHeader::Control(ControlOpcode::Heartbeat),
            SeqZero::new(0),
            true,
        )
        .unwrap();
        assert_eq!(forced.seg_count(), 1);
        assert!(forced.pdu(SegO::new(0)).unwrap().is_seg());
        assert!(forced.pdu(SegO::new(1)).is_none());
    }
}
