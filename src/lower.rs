//! Lower Transport Layer PDUs. Everything here is bit-exact to the Mesh Profile and Big Endian.
//!
//! | CTL | SEG | Format              |
//! |-----|-----|---------------------|
//! |  0  |  0  | Unsegmented Access  |
//! |  0  |  1  | Segmented Access    |
//! |  1  |  0  | Unsegmented Control |
//! |  1  |  1  | Segmented Control   |
use crate::control::ControlOpcode;
use crate::crypto::{AID, AKF};
use crate::mesh::{IVIndex, SequenceNumber, CTL};
use core::fmt::{Display, Formatter};

/// Size MIC flag. Set when a segmented access message carries an 8 byte TransMIC.
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct SZMIC(pub bool);

/// 13 bit SeqZero. The lowest 13 bits of the `SequenceNumber` of the first segment.
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct SeqZero(u16);
pub const SEQ_ZERO_MAX: u16 = (1_u16 << 13) - 1;
impl SeqZero {
    /// # Panics
    /// Panics if `v > SEQ_ZERO_MAX`.
    #[must_use]
    pub fn new(v: u16) -> Self {
        assert!(v <= SEQ_ZERO_MAX, "SeqZero {} overflow", v);
        SeqZero(v)
    }
    #[must_use]
    pub const fn new_masked(v: u16) -> Self {
        SeqZero(v & SEQ_ZERO_MAX)
    }
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0
    }
}
impl From<SequenceNumber> for SeqZero {
    fn from(seq: SequenceNumber) -> Self {
        SeqZero::new_masked((seq.value() & u32::from(SEQ_ZERO_MAX)) as u16)
    }
}
impl Display for SeqZero {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "SeqZero(0x{:04X})", self.0)
    }
}
/// Sequence Authentication value. `IVIndex || SequenceNumber` of the first segment of a message.
/// Recovered from the `SequenceNumber` of any segment and its `SeqZero`.
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub struct SeqAuth {
    iv_index: IVIndex,
    first_seq: SequenceNumber,
}
impl SeqAuth {
    /// `(seq & !0x1FFF) | seq_zero`, minus 8192 if the low bits of `seq` already wrapped past
    /// `seq_zero`. Returns `None` if that would underflow.
    #[must_use]
    pub fn new(iv_index: IVIndex, seq: SequenceNumber, seq_zero: SeqZero) -> Option<SeqAuth> {
        let mask = u32::from(SEQ_ZERO_MAX);
        let seq_zero = u32::from(seq_zero.value());
        let mut first = (seq.value() & !mask) | seq_zero;
        if seq.value() & mask < seq_zero {
            first = first.checked_sub(mask + 1)?;
        }
        Some(SeqAuth {
            iv_index,
            first_seq: SequenceNumber::new(first)?,
        })
    }
    #[must_use]
    pub fn iv_index(self) -> IVIndex {
        self.iv_index
    }
    #[must_use]
    pub fn first_seq(self) -> SequenceNumber {
        self.first_seq
    }
    #[must_use]
    pub fn seq_zero(self) -> SeqZero {
        self.first_seq.into()
    }
    #[must_use]
    pub fn value(self) -> u64 {
        (u64::from(self.iv_index.0) << 24) | u64::from(self.first_seq.value())
    }
}
impl Display for SeqAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "SeqAuth(0x{:014X})", self.value())
    }
}

/// Highest possible segment index. A message has at most 32 segments.
pub const SEG_MAX: u8 = 0x1F;

/// 5 bit SegO (Segment Offset number)
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct SegO(u8);
impl SegO {
    /// # Panics
    /// Panics if `v > SEG_MAX`.
    #[must_use]
    pub fn new(v: u8) -> Self {
        assert!(v <= SEG_MAX, "SegO {} overflow", v);
        Self(v)
    }
    #[must_use]
    pub const fn new_masked(v: u8) -> Self {
        Self(v & SEG_MAX)
    }
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}
impl From<SegO> for u8 {
    fn from(s: SegO) -> Self {
        s.0
    }
}
/// 5 bit SegN (Last Segment number)
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct SegN(u8);
impl SegN {
    /// # Panics
    /// Panics if `v > SEG_MAX`.
    #[must_use]
    pub fn new(v: u8) -> Self {
        assert!(v <= SEG_MAX, "SegN {} overflow", v);
        Self(v)
    }
    #[must_use]
    pub const fn new_masked(v: u8) -> Self {
        Self(v & SEG_MAX)
    }
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
    /// Number of segments in the message (`SegN + 1`).
    #[must_use]
    pub fn seg_count(self) -> usize {
        usize::from(self.0) + 1
    }
}
impl From<SegN> for u8 {
    fn from(s: SegN) -> Self {
        s.0
    }
}
/// 32 bit Block Acknowledgement. Bit `n` set means segment `n` was received.
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct BlockAck(pub u32);
impl BlockAck {
    /// Block ack with every segment up to (and including) `seg_n` set.
    #[must_use]
    pub fn full(seg_n: SegN) -> BlockAck {
        if seg_n.0 >= SEG_MAX {
            BlockAck(u32::MAX)
        } else {
            BlockAck((1_u32 << (u32::from(seg_n.0) + 1)) - 1)
        }
    }
    /// Sets the `bit` bit to 1. Does nothing if bit >= 32
    pub fn set(&mut self, bit: u8) {
        if bit >= 32 {
            return;
        }
        (self.0) |= 1_u32 << u32::from(bit);
    }
    /// Returns the bit status (1 or 0) of the `bit` bit. Returns `False` for bit >= 32
    #[must_use]
    pub fn get(self, bit: u8) -> bool {
        if bit >= 32 {
            false
        } else {
            (self.0 & (1_u32 << u32::from(bit))) != 0
        }
    }
    /// Returns if the block ack (up to `seg_n` bits) is all 1s. False if otherwise
    #[must_use]
    pub fn all_acked(self, seg_n: SegN) -> bool {
        let full = BlockAck::full(seg_n).0;
        self.0 & full == full
    }
    /// Segment indexes up to `seg_n` whose bit is still 0.
    pub fn unacked(self, seg_n: SegN) -> impl Iterator<Item = SegO> {
        (0..=seg_n.0)
            .filter(move |&i| !self.get(i))
            .map(SegO::new_masked)
    }
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
    #[must_use]
    pub const fn max_len() -> usize {
        32
    }
}
impl Display for BlockAck {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "BlockAck(0b{:b})", self.0)
    }
}
/// `SEG` bit, the top bit of every lower transport PDU.
fn is_seg(first_octet: u8) -> bool {
    first_octet & 0x80 != 0
}
/// Friend On Behalf Of flag in a Segment Acknowledgement.
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq, Default)]
pub struct OBO(pub bool);

/// The 3 octets following the first octet of every segmented PDU.
/// `flag` is `SZMIC` for access segments and RFU (0) for control segments.
#[derive(Copy, Clone, Hash, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub struct SegmentHeader {
    pub flag: bool,
    pub seq_zero: SeqZero,
    pub seg_o: SegO,
    pub seg_n: SegN,
}
impl SegmentHeader {
    #[must_use]
    pub fn new(flag: bool, seq_zero: SeqZero, seg_o: SegO, seg_n: SegN) -> Self {
        Self {
            flag,
            seq_zero,
            seg_o,
            seg_n,
        }
    }
    /// The header as the low 24 bits of a `u32`.
    #[must_use]
    pub fn pack(self) -> u32 {
        (u32::from(self.flag) << 23)
            | (u32::from(self.seq_zero.0) << 10)
            | (u32::from(self.seg_o.0) << 5)
            | u32::from(self.seg_n.0)
    }
    #[must_use]
    pub fn unpack(v: u32) -> Self {
        Self {
            flag: v & (1 << 23) != 0,
            seq_zero: SeqZero::new_masked((v >> 10) as u16),
            seg_o: SegO::new_masked((v >> 5) as u8),
            seg_n: SegN::new_masked(v as u8),
        }
    }
    #[must_use]
    pub fn to_bytes_be(self) -> [u8; 3] {
        let [_, b1, b2, b3] = self.pack().to_be_bytes();
        [b1, b2, b3]
    }
    #[must_use]
    pub fn from_bytes_be(bytes: &[u8]) -> Option<Self> {
        match *bytes {
            [b0, b1, b2] => Some(Self::unpack(u32::from_be_bytes([0, b0, b1, b2]))),
            _ => None,
        }
    }
    /// `SegO <= SegN`, otherwise the segment is garbage.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.seg_o.0 <= self.seg_n.0
    }
}
fn access_header(seg: bool, akf: AKF, aid: AID) -> u8 {
    (u8::from(seg) << 7) | (u8::from(akf.0) << 6) | aid.value()
}
fn unpack_access_header(b: u8) -> (AKF, AID) {
    (AKF(b & 0x40 != 0), AID::new_masked(b))
}

pub const UNSEGMENTED_ACCESS_PDU_LEN: usize = 15;
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct UnsegmentedAccessPDU {
    akf: AKF,
    aid: AID,
    access_pdu_buf: [u8; UNSEGMENTED_ACCESS_PDU_LEN],
    access_pdu_len: u8,
}
impl UnsegmentedAccessPDU {
    /// `data` is the whole Upper Transport PDU (encrypted access payload and TransMIC).
    /// # Panics
    /// Panics if `data.len() > UNSEGMENTED_ACCESS_PDU_LEN` (15)
    #[must_use]
    pub fn new(akf: AKF, aid: AID, data: &[u8]) -> UnsegmentedAccessPDU {
        assert!(
            data.len() <= UNSEGMENTED_ACCESS_PDU_LEN,
            "upper pdu overflow ({} > {})",
            data.len(),
            UNSEGMENTED_ACCESS_PDU_LEN
        );
        let mut buf = [0_u8; UNSEGMENTED_ACCESS_PDU_LEN];
        buf[..data.len()].copy_from_slice(data);
        UnsegmentedAccessPDU {
            akf,
            aid,
            access_pdu_buf: buf,
            access_pdu_len: data.len() as u8,
        }
    }
    #[must_use]
    pub fn akf(&self) -> AKF {
        self.akf
    }
    #[must_use]
    pub fn aid(&self) -> AID {
        self.aid
    }
    #[must_use]
    pub fn upper_pdu(&self) -> &[u8] {
        &self.access_pdu_buf[..usize::from(self.access_pdu_len)]
    }
    #[must_use]
    pub fn to_bytes(&self) -> PDUBytes {
        let mut buf = [0_u8; PDU::max_len()];
        buf[0] = access_header(false, self.akf, self.aid);
        let l = usize::from(self.access_pdu_len);
        buf[1..=l].copy_from_slice(self.upper_pdu());
        PDUBytes { buf, buf_len: l + 1 }
    }
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 2 || bytes.len() > UNSEGMENTED_ACCESS_PDU_LEN + 1 {
            return None;
        }
        if is_seg(bytes[0]) {
            // SEG is set (1) so it is a segmented message
            None
        } else {
            let (akf, aid) = unpack_access_header(bytes[0]);
            Some(Self::new(akf, aid, &bytes[1..]))
        }
    }
}
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct SegmentedAccessPDU {
    akf: AKF,
    aid: AID,
    segment_header: SegmentHeader,
    segment_buf: [u8; SegmentedAccessPDU::max_seg_len()],
    segment_buf_len: u8,
}

impl SegmentedAccessPDU {
    /// # Panics
    /// Panics if `data.len() > 12` or `data` is empty.
    #[must_use]
    pub fn new(
        akf: AKF,
        aid: AID,
        sz_mic: SZMIC,
        seq_zero: SeqZero,
        seg_o: SegO,
        seg_n: SegN,
        data: &[u8],
    ) -> Self {
        assert!(
            !data.is_empty() && data.len() <= Self::max_seg_len(),
            "bad segment length {}",
            data.len()
        );
        let mut buf = [0_u8; SegmentedAccessPDU::max_seg_len()];
        buf[..data.len()].copy_from_slice(data);
        Self {
            akf,
            aid,
            segment_header: SegmentHeader::new(sz_mic.0, seq_zero, seg_o, seg_n),
            segment_buf: buf,
            segment_buf_len: data.len() as u8,
        }
    }
    #[must_use]
    pub fn akf(&self) -> AKF {
        self.akf
    }
    #[must_use]
    pub fn aid(&self) -> AID {
        self.aid
    }
    #[must_use]
    pub fn szmic(&self) -> SZMIC {
        SZMIC(self.segment_header.flag)
    }
    #[must_use]
    pub const fn header(&self) -> &SegmentHeader {
        &self.segment_header
    }
    #[must_use]
    pub fn segment_data(&self) -> &[u8] {
        &self.segment_buf[..usize::from(self.segment_buf_len)]
    }

    #[must_use]
    pub fn to_bytes(&self) -> PDUBytes {
        let mut buf = [0_u8; PDU::max_len()];
        buf[0] = access_header(true, self.akf, self.aid);
        buf[1..4].copy_from_slice(&self.segment_header.to_bytes_be());
        let l = usize::from(self.segment_buf_len);
        buf[4..4 + l].copy_from_slice(self.segment_data());
        PDUBytes {
            buf,
            buf_len: 4 + l,
        }
    }
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 5 || bytes.len() > 4 + Self::max_seg_len() {
            return None;
        }
        if !is_seg(bytes[0]) {
            return None;
        }
        let (akf, aid) = unpack_access_header(bytes[0]);
        let header = SegmentHeader::from_bytes_be(&bytes[1..4])?;
        Some(Self::new(
            akf,
            aid,
            SZMIC(header.flag),
            header.seq_zero,
            header.seg_o,
            header.seg_n,
            &bytes[4..],
        ))
    }
    #[must_use]
    pub const fn max_seg_len() -> usize {
        12
    }
}

pub const UNSEGMENTED_CONTROL_PDU_LEN: usize = 11;
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct UnsegmentedControlPDU {
    parameters_buf: [u8; UNSEGMENTED_CONTROL_PDU_LEN],
    parameters_len: u8,
    opcode: ControlOpcode,
}
impl UnsegmentedControlPDU {
    /// # Panics
    /// Panics if `parameters.len() > UNSEGMENTED_CONTROL_PDU_LEN` (11)
    #[must_use]
    pub fn new(opcode: ControlOpcode, parameters: &[u8]) -> UnsegmentedControlPDU {
        assert!(
            parameters.len() <= UNSEGMENTED_CONTROL_PDU_LEN,
            "parameter overflow ({} > {})",
            parameters.len(),
            UNSEGMENTED_CONTROL_PDU_LEN
        );
        let mut buf = [0_u8; UNSEGMENTED_CONTROL_PDU_LEN];
        buf[..parameters.len()].copy_from_slice(parameters);
        UnsegmentedControlPDU {
            parameters_buf: buf,
            parameters_len: parameters.len() as u8,
            opcode,
        }
    }
    #[must_use]
    pub const fn opcode(&self) -> ControlOpcode {
        self.opcode
    }
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.parameters_buf[..usize::from(self.parameters_len)]
    }
    #[must_use]
    pub fn to_bytes(&self) -> PDUBytes {
        let mut buf = [0_u8; PDU::max_len()];
        buf[0] = u8::from(self.opcode);
        let l = usize::from(self.parameters_len);
        buf[1..=l].copy_from_slice(self.data());
        PDUBytes { buf, buf_len: l + 1 }
    }
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > UNSEGMENTED_CONTROL_PDU_LEN + 1 {
            return None;
        }
        if is_seg(bytes[0]) {
            return None;
        }
        Some(Self::new(ControlOpcode::new(bytes[0])?, &bytes[1..]))
    }
}
/// Segmented Control PDU Lengths
/// | # Packets  | PDU Size |
/// |      1     |     8    |
/// |      2     |    16    |
/// |      3     |    24    |
/// |      n     |    n*8   |
/// |     32     |    256   |
const MAX_SEGMENTED_CONTROL_PDU_LEN: usize = 8;
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct SegmentedControlPDU {
    opcode: ControlOpcode,
    segment_header: SegmentHeader,
    segment_buf: [u8; MAX_SEGMENTED_CONTROL_PDU_LEN],
    segment_buf_len: u8,
}
impl SegmentedControlPDU {
    /// # Panics
    /// Panics if `data.len() > MAX_SEGMENTED_CONTROL_PDU_LEN` (8) or `data` is empty.
    #[must_use]
    pub fn new(opcode: ControlOpcode, header: SegmentHeader, data: &[u8]) -> SegmentedControlPDU {
        assert!(
            !data.is_empty() && data.len() <= MAX_SEGMENTED_CONTROL_PDU_LEN,
            "bad segment length {}",
            data.len(),
        );
        let mut buf = [0_u8; MAX_SEGMENTED_CONTROL_PDU_LEN];
        buf[..data.len()].copy_from_slice(data);
        SegmentedControlPDU {
            opcode,
            // RFU bit
            segment_header: SegmentHeader { flag: false, ..header },
            segment_buf: buf,
            segment_buf_len: data.len() as u8,
        }
    }
    #[must_use]
    pub fn segment_data(&self) -> &[u8] {
        &self.segment_buf[..usize::from(self.segment_buf_len)]
    }
    #[must_use]
    pub const fn opcode(&self) -> ControlOpcode {
        self.opcode
    }
    #[must_use]
    pub const fn header(&self) -> &SegmentHeader {
        &self.segment_header
    }
    #[must_use]
    pub const fn max_seg_len() -> usize {
        MAX_SEGMENTED_CONTROL_PDU_LEN
    }
    #[must_use]
    pub fn to_bytes(&self) -> PDUBytes {
        let mut buf = [0_u8; PDU::max_len()];
        buf[0] = 0x80 | u8::from(self.opcode);
        buf[1..4].copy_from_slice(&self.segment_header.to_bytes_be());
        let l = usize::from(self.segment_buf_len);
        buf[4..4 + l].copy_from_slice(self.segment_data());
        PDUBytes {
            buf,
            buf_len: 4 + l,
        }
    }
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 5 || bytes.len() > 4 + MAX_SEGMENTED_CONTROL_PDU_LEN {
            return None;
        }
        if !is_seg(bytes[0]) {
            return None;
        }
        let opcode = ControlOpcode::new(bytes[0] & 0x7F)?;
        let header = SegmentHeader::from_bytes_be(&bytes[1..4])?;
        Some(Self::new(opcode, header, &bytes[4..]))
    }
}

/// A single segment of either kind.
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub enum SegmentedPDU {
    Access(SegmentedAccessPDU),
    Control(SegmentedControlPDU),
}
impl SegmentedPDU {
    #[must_use]
    pub fn header(&self) -> &SegmentHeader {
        match self {
            SegmentedPDU::Access(p) => p.header(),
            SegmentedPDU::Control(p) => p.header(),
        }
    }
    #[must_use]
    pub fn segment_data(&self) -> &[u8] {
        match self {
            SegmentedPDU::Access(p) => p.segment_data(),
            SegmentedPDU::Control(p) => p.segment_data(),
        }
    }
    #[must_use]
    pub fn max_seg_len(&self) -> usize {
        match self {
            SegmentedPDU::Access(_) => SegmentedAccessPDU::max_seg_len(),
            SegmentedPDU::Control(_) => SegmentedControlPDU::max_seg_len(),
        }
    }
}
impl From<SegmentedPDU> for PDU {
    fn from(p: SegmentedPDU) -> Self {
        match p {
            SegmentedPDU::Access(a) => PDU::SegmentedAccess(a),
            SegmentedPDU::Control(c) => PDU::SegmentedControl(c),
        }
    }
}

#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub enum PDU {
    UnsegmentedAccess(UnsegmentedAccessPDU),
    SegmentedAccess(SegmentedAccessPDU),
    UnsegmentedControl(UnsegmentedControlPDU),
    SegmentedControl(SegmentedControlPDU),
}
impl PDU {
    #[must_use]
    pub fn is_seg(&self) -> bool {
        match self {
            PDU::UnsegmentedAccess(_) | PDU::UnsegmentedControl(_) => false,
            PDU::SegmentedAccess(_) | PDU::SegmentedControl(_) => true,
        }
    }
    #[must_use]
    pub fn is_control(&self) -> bool {
        match self {
            PDU::UnsegmentedAccess(_) | PDU::SegmentedAccess(_) => false,
            PDU::UnsegmentedControl(_) | PDU::SegmentedControl(_) => true,
        }
    }
    #[must_use]
    pub fn ctl(&self) -> CTL {
        CTL(self.is_control())
    }
    #[must_use]
    pub fn segmented(&self) -> Option<SegmentedPDU> {
        match self {
            PDU::SegmentedAccess(a) => Some(SegmentedPDU::Access(*a)),
            PDU::SegmentedControl(c) => Some(SegmentedPDU::Control(*c)),
            _ => None,
        }
    }
    /// Number of bytes required to hold any serialized `Lower::PDU` in a byte buffer.
    #[must_use]
    pub const fn max_len() -> usize {
        16
    }
    #[must_use]
    pub fn to_bytes(&self) -> PDUBytes {
        match self {
            PDU::UnsegmentedAccess(p) => p.to_bytes(),
            PDU::SegmentedAccess(p) => p.to_bytes(),
            PDU::UnsegmentedControl(p) => p.to_bytes(),
            PDU::SegmentedControl(p) => p.to_bytes(),
        }
    }
    /// Returns `None` for empty, oversized or otherwise unparsable bytes (including unknown
    /// control opcodes).
    #[must_use]
    pub fn from_bytes(bytes: &[u8], ctl: CTL) -> Option<Self> {
        let first = *bytes.first()?;
        Some(match (ctl.0, is_seg(first)) {
            (true, true) => PDU::SegmentedControl(SegmentedControlPDU::from_bytes(bytes)?),
            (true, false) => PDU::UnsegmentedControl(UnsegmentedControlPDU::from_bytes(bytes)?),
            (false, false) => PDU::UnsegmentedAccess(UnsegmentedAccessPDU::from_bytes(bytes)?),
            (false, true) => PDU::SegmentedAccess(SegmentedAccessPDU::from_bytes(bytes)?),
        })
    }
}
#[derive(Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Hash, Debug)]
pub struct PDUBytes {
    buf: [u8; PDU::max_len()],
    buf_len: usize,
}
impl PDUBytes {
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf_len
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf_len == 0
    }
}
impl AsRef<[u8]> for PDUBytes {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.buf_len]
    }
}
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_header_bits() {
        let pdu = SegmentedAccessPDU::new(
            AKF(true),
            AID::new(0x15),
            SZMIC(false),
            SeqZero::new(0x0123),
            SegO::new(2),
            SegN::new(3),
            &[0xAA; 12],
        );
        let bytes = pdu.to_bytes();
        assert_eq!(&bytes.as_ref()[..4], &[0xD5, 0x04, 0x8C, 0x43]);
        assert_eq!(bytes.len(), 16);
        let back = PDU::from_bytes(bytes.as_ref(), CTL(false)).unwrap();
        assert_eq!(back, PDU::SegmentedAccess(pdu));
    }
    #[test]
    fn test_segment_header_extremes() {
        let header = SegmentHeader::new(true, SeqZero::new(SEQ_ZERO_MAX), SegO::new(31), SegN::new(31));
        assert_eq!(header.to_bytes_be(), [0xFF, 0xFF, 0xFF]);
        assert_eq!(SegmentHeader::from_bytes_be(&[0xFF, 0xFF, 0xFF]), Some(header));
    }
    #[test]
    fn test_unsegmented_access_header() {
        let pdu = UnsegmentedAccessPDU::new(AKF(true), AID::new(0x26), &[1, 2, 3, 4, 5]);
        assert_eq!(pdu.to_bytes().as_ref(), &[0x66, 1, 2, 3, 4, 5]);
        let dev = UnsegmentedAccessPDU::new(AKF(false), AID::new(0), &[9; 15]);
        assert_eq!(dev.to_bytes().as_ref()[0], 0x00);
        assert_eq!(dev.to_bytes().len(), 16);
    }
    #[test]
    fn test_control_segment_rfu_bit() {
        let header = SegmentHeader::new(true, SeqZero::new(1), SegO::new(0), SegN::new(1));
        let pdu = SegmentedControlPDU::new(ControlOpcode::Heartbeat, header, &[1; 8]);
        let bytes = pdu.to_bytes();
        assert_eq!(bytes.as_ref()[0], 0x8A);
        assert_eq!(bytes.as_ref()[1] & 0x80, 0);
    }
    #[test]
    fn test_block_ack() {
        let seg_n = SegN::new(3);
        let mut ack = BlockAck::default();
        for i in &[0, 2, 3] {
            ack.set(*i);
        }
        assert!(ack.get(0) && !ack.get(1) && ack.get(2) && ack.get(3));
        assert!(!ack.all_acked(seg_n));
        assert_eq!(ack.unacked(seg_n).collect::<Vec<_>>(), vec![SegO::new(1)]);
        ack.set(1);
        assert!(ack.all_acked(seg_n));
        assert_eq!(BlockAck::full(SegN::new(31)), BlockAck(u32::MAX));
        assert_eq!(BlockAck::full(SegN::new(0)), BlockAck(1));
    }
    #[test]
    fn test_seq_auth() {
        let seq = |s| SequenceNumber::new(s).unwrap();
        let iv = IVIndex(0x1234);
        let auth = SeqAuth::new(iv, seq(0x0000_2005), SeqZero::new(0x0003)).unwrap();
        assert_eq!(auth.first_seq(), seq(0x2003));
        // Low bits wrapped since the first segment.
        let wrapped = SeqAuth::new(iv, seq(0x0000_4001), SeqZero::new(0x1FFE)).unwrap();
        assert_eq!(wrapped.first_seq(), seq(0x3FFE));
        assert_eq!(wrapped.seq_zero(), SeqZero::new(0x1FFE));
        assert_eq!(SeqAuth::new(iv, seq(0x0001), SeqZero::new(0x0005)), None);
        assert!(wrapped > auth);
        assert_eq!(auth.value(), (0x1234_u64 << 24) | 0x2003);
    }
    #[test]
    fn test_bad_lower_bytes() {
        assert_eq!(PDU::from_bytes(&[], CTL(false)), None);
        // Segmented access with no segment data.
        assert_eq!(PDU::from_bytes(&[0x80, 0, 0, 0], CTL(false)), None);
        // Unknown control opcode.
        assert_eq!(PDU::from_bytes(&[0x7E, 1], CTL(true)), None);
    }
}
