//! Packet wire format
//!
//! Each packet is one decoded Intel HEX record, sent as raw binary:
//!
//! | Offset | Size  | Meaning |
//! |--------|-------|---------|
//! | 0      | 1     | Declared length L (bytes following this one) |
//! | 1      | 2     | Byte address, big-endian |
//! | 3      | 1     | Record type: 0 = Data, 1 = EndOfFile |
//! | 4      | L - 3 | Payload (Data records only, even length) |
//!
//! The receiver knows how many bytes actually arrived; a packet whose
//! length byte disagrees with that count is rejected before anything else
//! is looked at.

use crate::error::{Error, Result};
use heapless::Vec;

/// Length byte + address + record type
pub const HEADER_LEN: usize = 4;
/// Largest packet the one-byte length field can describe
pub const MAX_PACKET_LEN: usize = u8::MAX as usize + 1;
/// Largest payload that fits in a packet
pub const MAX_PAYLOAD_LEN: usize = MAX_PACKET_LEN - HEADER_LEN;

/// Record type of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// Bytes to program at the packet address
    Data,
    /// End of the image
    EndOfFile,
}

impl RecordType {
    /// Wire value of the record type
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Data => 0,
            Self::EndOfFile => 1,
        }
    }
}

impl TryFrom<u8> for RecordType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Data),
            1 => Ok(Self::EndOfFile),
            _ => Err(Error::UnsupportedRecordType),
        }
    }
}

/// Bounds-checked reader over a packet buffer
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or(Error::InvalidPacket)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16_be(&mut self) -> Result<u16> {
        let hi = self.read_u8()?;
        let lo = self.read_u8()?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::InvalidPacket)?;
        let slice = self.buf.get(self.pos..end).ok_or(Error::InvalidPacket)?;
        self.pos = end;
        Ok(slice)
    }
}

/// A decoded packet borrowing its payload from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    /// Byte address of the first payload byte
    pub address: u16,
    /// Record type
    pub record_type: RecordType,
    /// Payload bytes (empty for EndOfFile)
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Decode and validate a packet
    ///
    /// `buf` must hold exactly the bytes that were received.
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::InvalidPacket);
        }

        let mut cursor = Cursor::new(buf);
        let declared = cursor.read_u8()? as usize;
        if buf.len() != declared + 1 {
            return Err(Error::InvalidPacket);
        }

        let address = cursor.read_u16_be()?;
        let record_type = RecordType::try_from(cursor.read_u8()?)?;
        let payload = cursor.take(declared - (HEADER_LEN - 1))?;

        match record_type {
            RecordType::Data if payload.len() % 2 != 0 => Err(Error::InvalidPacket),
            RecordType::Data => Ok(Self {
                address,
                record_type,
                payload,
            }),
            RecordType::EndOfFile => Ok(Self {
                address,
                record_type,
                payload: &[],
            }),
        }
    }

    /// Flash word address of the first payload word
    pub fn word_address(&self) -> u32 {
        self.address as u32 / 2
    }

    /// Iterate over `(word_address, low_byte, high_byte)` for every payload word
    pub fn words(&self) -> impl Iterator<Item = (u32, u8, u8)> + 'a {
        let base = self.word_address();
        let payload: &'a [u8] = self.payload;
        payload
            .chunks_exact(2)
            .enumerate()
            .map(move |(i, pair)| (base + i as u32, pair[0], pair[1]))
    }
}

/// Encoded packet buffer
pub type PacketBuf = Vec<u8, MAX_PACKET_LEN>;

fn encode(address: u16, record_type: RecordType, payload: &[u8]) -> Result<PacketBuf> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(Error::InvalidPacket);
    }
    let declared = (payload.len() + HEADER_LEN - 1) as u8;

    let mut buf = PacketBuf::new();
    let [hi, lo] = address.to_be_bytes();
    buf.extend_from_slice(&[declared, hi, lo, record_type.as_u8()])
        .map_err(|_| Error::InvalidPacket)?;
    buf.extend_from_slice(payload)
        .map_err(|_| Error::InvalidPacket)?;
    Ok(buf)
}

/// Encode a Data packet
///
/// The payload must be an even number of bytes and fit in one packet.
pub fn encode_data(address: u16, payload: &[u8]) -> Result<PacketBuf> {
    if payload.len() % 2 != 0 {
        return Err(Error::InvalidPacket);
    }
    encode(address, RecordType::Data, payload)
}

/// Encode the EndOfFile packet
pub fn encode_eof() -> PacketBuf {
    let mut buf = PacketBuf::new();
    // Four bytes always fit
    let _ = buf.extend_from_slice(&[(HEADER_LEN - 1) as u8, 0, 0, RecordType::EndOfFile.as_u8()]);
    buf
}

/// Split a raw binary image into Data packets followed by EndOfFile
///
/// `chunk_len` is rounded down to an even value between 2 and
/// [`MAX_PAYLOAD_LEN`]. An odd-length image is padded with 0xFF, the erased
/// flash value. Fails if the image does not fit below 64 KiB from `base`.
pub fn chunk_image(image: &[u8], base: u16, chunk_len: usize) -> Result<ImageChunks<'_>> {
    if base as usize + image.len() > u16::MAX as usize + 1 {
        return Err(Error::InvalidPacket);
    }
    let chunk_len = chunk_len.clamp(2, MAX_PAYLOAD_LEN) & !1;
    Ok(ImageChunks {
        image,
        base,
        chunk_len,
        offset: 0,
        done: false,
    })
}

/// Iterator returned by [`chunk_image`]
#[derive(Debug, Clone)]
pub struct ImageChunks<'a> {
    image: &'a [u8],
    base: u16,
    chunk_len: usize,
    offset: usize,
    done: bool,
}

impl ImageChunks<'_> {
    /// Number of packets still to be produced, EndOfFile included
    pub fn remaining(&self) -> usize {
        if self.done {
            return 0;
        }
        let left = self.image.len() - self.offset;
        left.div_ceil(self.chunk_len) + 1
    }
}

impl Iterator for ImageChunks<'_> {
    type Item = PacketBuf;

    fn next(&mut self) -> Option<PacketBuf> {
        if self.done {
            return None;
        }
        if self.offset >= self.image.len() {
            self.done = true;
            return Some(encode_eof());
        }

        let end = (self.offset + self.chunk_len).min(self.image.len());
        let mut payload: Vec<u8, MAX_PAYLOAD_LEN> = Vec::new();
        // chunk_len <= MAX_PAYLOAD_LEN, so neither push can overflow
        let _ = payload.extend_from_slice(&self.image[self.offset..end]);
        if payload.len() % 2 != 0 {
            let _ = payload.push(0xFF);
        }

        let address = self.base.wrapping_add(self.offset as u16);
        self.offset = end;
        // Even, bounded payload: encoding cannot fail
        encode_data(address, &payload).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

/// Splits a capture of back-to-back packets into individual packets
///
/// Each packet is delimited by its own length byte. A truncated final
/// packet is yielded as-is so that decoding reports it as invalid.
#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    stream: &'a [u8],
}

impl<'a> PacketReader<'a> {
    /// Create a reader over a packet stream
    pub fn new(stream: &'a [u8]) -> Self {
        Self { stream }
    }
}

impl<'a> Iterator for PacketReader<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let declared = *self.stream.first()? as usize;
        let len = (declared + 1).min(self.stream.len());
        let (packet, rest) = self.stream.split_at(len);
        self.stream = rest;
        Some(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec as StdVec;

    #[test]
    fn test_parse_data_record() {
        let buf = [0x07, 0x01, 0x00, 0x00, 0x0C, 0x94, 0x5C, 0x00];
        let packet = Packet::parse(&buf).unwrap();
        assert_eq!(packet.address, 0x0100);
        assert_eq!(packet.record_type, RecordType::Data);
        assert_eq!(packet.word_address(), 0x80);
        let words: StdVec<_> = packet.words().collect();
        assert_eq!(words, [(0x80, 0x0C, 0x94), (0x81, 0x5C, 0x00)]);
    }

    #[test]
    fn test_parse_eof_record() {
        let packet = Packet::parse(&[0x03, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(packet.record_type, RecordType::EndOfFile);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn test_length_mismatch_is_invalid() {
        // Declares 5 bytes following, only 3 arrived
        assert_eq!(
            Packet::parse(&[0x05, 0x00, 0x00, 0x00]),
            Err(Error::InvalidPacket)
        );
        // Declares fewer bytes than arrived
        assert_eq!(
            Packet::parse(&[0x03, 0x00, 0x00, 0x00, 0xAA, 0xBB]),
            Err(Error::InvalidPacket)
        );
    }

    #[test]
    fn test_short_packets_are_invalid() {
        assert_eq!(Packet::parse(&[]), Err(Error::InvalidPacket));
        assert_eq!(Packet::parse(&[0x02, 0x00, 0x00]), Err(Error::InvalidPacket));
        // Self-consistent but too short to hold a record type
        assert_eq!(Packet::parse(&[0x01, 0x00]), Err(Error::InvalidPacket));
    }

    #[test]
    fn test_framing_checked_before_record_type() {
        assert_eq!(
            Packet::parse(&[0x09, 0x00, 0x00, 0x04]),
            Err(Error::InvalidPacket)
        );
        assert_eq!(
            Packet::parse(&[0x03, 0x00, 0x00, 0x04]),
            Err(Error::UnsupportedRecordType)
        );
    }

    #[test]
    fn test_odd_payload_is_invalid() {
        assert_eq!(
            Packet::parse(&[0x04, 0x00, 0x00, 0x00, 0xAA]),
            Err(Error::InvalidPacket)
        );
    }

    #[test]
    fn test_encode_data_layout() {
        let buf = encode_data(0x1234, &[0xDE, 0xAD]).unwrap();
        assert_eq!(buf.as_slice(), [0x05, 0x12, 0x34, 0x00, 0xDE, 0xAD]);
        assert_eq!(encode_data(0, &[0x01]), Err(Error::InvalidPacket));
        assert_eq!(encode_eof().as_slice(), [0x03, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = [0u8; MAX_PAYLOAD_LEN + 2];
        assert_eq!(encode_data(0, &payload), Err(Error::InvalidPacket));
        let payload = [0u8; MAX_PAYLOAD_LEN];
        assert_eq!(encode_data(0, &payload).unwrap().len(), MAX_PACKET_LEN);
    }

    #[test]
    fn test_chunk_image_addresses_and_padding() {
        let image = [1u8, 2, 3, 4, 5];
        let chunks = chunk_image(&image, 0x0200, 4).unwrap();
        assert_eq!(chunks.remaining(), 3);
        let packets: StdVec<PacketBuf> = chunks.collect();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].as_slice(), [0x07, 0x02, 0x00, 0x00, 1, 2, 3, 4]);
        assert_eq!(packets[1].as_slice(), [0x05, 0x02, 0x04, 0x00, 5, 0xFF]);
        assert_eq!(packets[2].as_slice(), [0x03, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_chunk_image_rejects_overflow() {
        let image = [0u8; 16];
        assert!(chunk_image(&image, 0xFFF8, 8).is_err());
        assert!(chunk_image(&image, 0xFFF0, 8).is_ok());
    }

    #[test]
    fn test_packet_reader_splits_stream() {
        let stream = [
            0x05, 0x00, 0x00, 0x00, 0xAA, 0xBB, // data
            0x03, 0x00, 0x00, 0x01, // eof
            0x09, 0x00, // truncated
        ];
        let packets: StdVec<&[u8]> = PacketReader::new(&stream).collect();
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0], &stream[..6]);
        assert_eq!(packets[1], &stream[6..10]);
        assert_eq!(Packet::parse(packets[2]), Err(Error::InvalidPacket));
    }
}
