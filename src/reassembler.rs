//! Transport Layer Reassembler. Collects segments of one Upper Transport PDU by `SegO`.
use crate::crypto::aes::MicSize;
use crate::lower::{BlockAck, SegN, SegO, SegmentedPDU};
use crate::segmenter::LowerHeader;
use core::fmt::{Display, Formatter};

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub enum ReassembleError {
    SegmentAlreadyInserted,
    DataTooLong,
    /// Only the last segment may be shorter than the maximum segment length.
    ShortSegment,
    SegmentOutOfBounds,
    /// `SegN` or lower header doesn't match the first segment received.
    HeaderMismatch,
}
impl Display for ReassembleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            ReassembleError::SegmentAlreadyInserted => "segment already inserted",
            ReassembleError::DataTooLong => "segment data too long",
            ReassembleError::ShortSegment => "non-final segment shorter than maximum",
            ReassembleError::SegmentOutOfBounds => "SegO bigger than SegN",
            ReassembleError::HeaderMismatch => "segment header doesn't match",
        };
        f.write_str(s)
    }
}
impl std::error::Error for ReassembleError {}

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct ContextHeader {
    lower_header: LowerHeader,
    seg_n: SegN,
    block_ack: BlockAck,
}
impl ContextHeader {
    #[must_use]
    pub fn new(lower_header: LowerHeader, seg_n: SegN) -> Self {
        Self {
            lower_header,
            seg_n,
            block_ack: BlockAck::default(),
        }
    }
    /// Builds the header from any segment of the message.
    #[must_use]
    pub fn from_segment(segment: &SegmentedPDU) -> Self {
        let lower_header = match segment {
            SegmentedPDU::Access(a) => LowerHeader::Access {
                akf: a.akf(),
                aid: a.aid(),
                szmic: a.szmic(),
            },
            SegmentedPDU::Control(c) => LowerHeader::Control(c.opcode()),
        };
        Self::new(lower_header, segment.header().seg_n)
    }
    #[must_use]
    pub fn all_acked(&self) -> bool {
        self.block_ack.all_acked(self.seg_n)
    }
    #[must_use]
    pub fn lower_header(&self) -> LowerHeader {
        self.lower_header
    }
    #[must_use]
    pub fn seg_n(&self) -> SegN {
        self.seg_n
    }
    #[must_use]
    pub fn seg_count(&self) -> usize {
        self.seg_n.seg_count()
    }
    #[must_use]
    pub const fn block_ack(&self) -> BlockAck {
        self.block_ack
    }
    #[must_use]
    pub fn max_seg_len(&self) -> usize {
        self.lower_header.max_seg_len()
    }
    #[must_use]
    pub fn seg_pos(&self, seg_o: SegO) -> Option<usize> {
        if seg_o.value() > self.seg_n.value() {
            None
        } else {
            Some(usize::from(seg_o.value()) * self.max_seg_len())
        }
    }
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_seg_len() * self.seg_count()
    }
    /// `None` for control messages which don't have a TransMIC.
    #[must_use]
    pub fn mic_size(&self) -> Option<MicSize> {
        match self.lower_header {
            LowerHeader::Access { szmic, .. } => Some(if szmic.0 {
                MicSize::Big
            } else {
                MicSize::Small
            }),
            LowerHeader::Control(_) => None,
        }
    }
}
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Context {
    storage: Vec<u8>,
    data_len: usize,
    header: ContextHeader,
}
impl Context {
    #[must_use]
    pub fn new(header: ContextHeader) -> Self {
        Self {
            storage: vec![0_u8; header.max_len()],
            data_len: 0,
            header,
        }
    }
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.header.all_acked()
    }
    #[must_use]
    pub fn header(&self) -> &ContextHeader {
        &self.header
    }
    #[must_use]
    pub fn block_ack(&self) -> BlockAck {
        self.header.block_ack
    }
    /// Inserts `segment` at its `SegO`. Nothing is changed if an error is returned.
    pub fn insert(&mut self, segment: &SegmentedPDU) -> Result<(), ReassembleError> {
        if ContextHeader::from_segment(segment).lower_header != self.header.lower_header
            || segment.header().seg_n != self.header.seg_n
        {
            return Err(ReassembleError::HeaderMismatch);
        }
        self.insert_data(segment.header().seg_o, segment.segment_data())
    }
    pub fn insert_data(&mut self, seg_o: SegO, data: &[u8]) -> Result<(), ReassembleError> {
        let max = self.header.max_seg_len();
        if data.len() > max {
            return Err(ReassembleError::DataTooLong);
        }
        let pos = self
            .header
            .seg_pos(seg_o)
            .ok_or(ReassembleError::SegmentOutOfBounds)?;
        let is_last = seg_o.value() == self.header.seg_n.value();
        if !is_last && data.len() != max {
            return Err(ReassembleError::ShortSegment);
        }
        if self.header.block_ack.get(seg_o.value()) {
            return Err(ReassembleError::SegmentAlreadyInserted);
        }
        self.storage[pos..pos + data.len()].copy_from_slice(data);
        self.header.block_ack.set(seg_o.value());
        if is_last {
            // Last Seg
            self.data_len = pos + data.len();
        }
        Ok(())
    }
    /// Returns the reassembled Upper Transport PDU or gives back `self` if segments are missing.
    pub fn finish(self) -> Result<Vec<u8>, Self> {
        if !self.is_ready() {
            Err(self)
        } else {
            let mut storage = self.storage;
            storage.truncate(self.data_len);
            Ok(storage)
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{AID, AKF};
    use crate::lower::{SZMIC, SeqZero, SegmentedAccessPDU};

    fn segment(seg_o: u8, seg_n: u8, data: &[u8]) -> SegmentedPDU {
        SegmentedPDU::Access(SegmentedAccessPDU::new(
            AKF(true),
            AID::new(3),
            SZMIC(false),
            SeqZero::new(10),
            SegO::new(seg_o),
            SegN::new(seg_n),
            data,
        ))
    }
    #[test]
    fn test_out_of_order() {
        let first = segment(2, 3, &[2; 12]);
        let mut context = Context::new(ContextHeader::from_segment(&first));
        for s in &[first, segment(0, 3, &[0; 12]), segment(3, 3, &[3; 5])] {
            context.insert(s).unwrap();
        }
        assert_eq!(context.block_ack(), BlockAck(0b1101));
        assert!(!context.is_ready());
        let context = context.finish().unwrap_err();
        let mut context = context;
        context.insert(&segment(1, 3, &[1; 12])).unwrap();
        assert!(context.is_ready());
        let pdu = context.finish().unwrap();
        assert_eq!(pdu.len(), 36 + 5);
        assert_eq!(&pdu[12..24], &[1; 12]);
        assert_eq!(&pdu[36..], &[3; 5]);
    }
    #[test]
    fn test_bad_segments_dont_change_state() {
        let first = segment(0, 1, &[0; 12]);
        let mut context = Context::new(ContextHeader::from_segment(&first));
        context.insert(&first).unwrap();
        let before = context.clone();
        assert_eq!(
            context.insert(&first),
            Err(ReassembleError::SegmentAlreadyInserted)
        );
        assert_eq!(
            context.insert(&segment(1, 2, &[1; 12])),
            Err(ReassembleError::HeaderMismatch)
        );
        assert_eq!(
            context.insert_data(SegO::new(2), &[1; 4]),
            Err(ReassembleError::SegmentOutOfBounds)
        );
        assert_eq!(
            context.insert_data(SegO::new(0), &[1; 4]),
            Err(ReassembleError::ShortSegment)
        );
        assert_eq!(context, before);
        assert_eq!(context.header().mic_size(), Some(MicSize::Small));
    }
}
