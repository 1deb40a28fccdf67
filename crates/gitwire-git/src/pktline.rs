//! PKT-LINE framing for the git smart HTTP protocol.
//!
//! Every line exchanged by upload-pack and receive-pack (refs, want/have,
//! commands, ACK/NAK, status reports) is wrapped in a 4-hex-digit length
//! prefix, or the reserved `0000` flush marker. A packfile is the one
//! exception: once a `PACK` magic is seen, everything from that point on is
//! opaque binary payload and is no longer PKT-LINE framed.

use crate::{GitError, Result};
use std::io::{Read, Write};

/// A single decoded PKT-LINE token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PktLine {
    /// A length-prefixed data line.
    Data(Vec<u8>),
    /// The `0000` flush packet.
    Flush,
    /// Everything from a `PACK` magic onward, read to EOF. Once this is
    /// returned, the reader has stopped doing length-prefixed framing.
    Pack(Vec<u8>),
}

impl PktLine {
    /// Creates a data packet from a string slice.
    pub fn from_string(s: &str) -> Self {
        Self::Data(s.as_bytes().to_vec())
    }

    /// Creates a data packet from bytes.
    pub fn from_bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::Data(b.into())
    }

    /// Encodes the packet to bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Data(data) => {
                let len = data.len() + 4; // 4 bytes for the length prefix
                let mut result = format!("{:04x}", len).into_bytes();
                result.extend_from_slice(data);
                result
            }
            Self::Flush => b"0000".to_vec(),
            Self::Pack(bytes) => bytes.clone(),
        }
    }

    /// Returns true if this is a flush packet.
    pub fn is_flush(&self) -> bool {
        matches!(self, Self::Flush)
    }

    /// Returns true if this is an opaque pack token.
    pub fn is_pack(&self) -> bool {
        matches!(self, Self::Pack(_))
    }

    /// Returns the data content, or None for special packets.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(data) => Some(data),
            _ => None,
        }
    }

    /// Returns the data as a string, trimming any trailing newline.
    pub fn as_str(&self) -> Option<&str> {
        self.data()
            .and_then(|d| std::str::from_utf8(d).ok())
            .map(|s| s.trim_end_matches('\n'))
    }
}

const PACK_MAGIC: &[u8; 4] = b"PACK";

/// Reader for PKT-LINE framed input.
///
/// Once [`PktLineReader::read`] returns a [`PktLine::Pack`], the stream has
/// switched to raw packfile bytes and further calls to `read` are not
/// meaningful; use [`PktLineReader::inner_mut`] if more raw bytes need to be
/// consumed (`read` already drains to EOF when it detects the magic).
pub struct PktLineReader<R> {
    reader: R,
}

impl<R: Read> PktLineReader<R> {
    /// Creates a new pkt-line reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next packet.
    ///
    /// Returns `Ok(None)` on a clean EOF before any bytes were read for this
    /// token. A `PACK` magic mid-stream is not an EOF: it is read out fully
    /// as a single [`PktLine::Pack`] token.
    pub fn read(&mut self) -> Result<Option<PktLine>> {
        let mut prefix = [0u8; 4];
        match self.reader.read_exact(&mut prefix) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if &prefix == PACK_MAGIC {
            let mut rest = Vec::new();
            self.reader.read_to_end(&mut rest)?;
            let mut pack = Vec::with_capacity(4 + rest.len());
            pack.extend_from_slice(PACK_MAGIC);
            pack.extend_from_slice(&rest);
            return Ok(Some(PktLine::Pack(pack)));
        }

        if &prefix == b"0000" {
            return Ok(Some(PktLine::Flush));
        }

        let len_str = std::str::from_utf8(&prefix)
            .map_err(|_| GitError::MalformedPktLine("non-hex length prefix".to_string()))?;
        let len = u16::from_str_radix(len_str, 16)
            .map_err(|_| GitError::MalformedPktLine(format!("invalid length {:?}", len_str)))?
            as usize;

        if len < 4 {
            return Err(GitError::MalformedPktLine(format!(
                "length {} smaller than header",
                len
            )));
        }

        let data_len = len - 4;
        let mut data = vec![0u8; data_len];
        self.reader.read_exact(&mut data).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                GitError::UnexpectedEof
            } else {
                GitError::Io(e)
            }
        })?;

        Ok(Some(PktLine::Data(data)))
    }

    /// Reads all data packets until a flush packet (or EOF).
    pub fn read_until_flush(&mut self) -> Result<Vec<PktLine>> {
        let mut packets = Vec::new();
        loop {
            match self.read()? {
                Some(PktLine::Flush) | None => break,
                Some(pkt) => packets.push(pkt),
            }
        }
        Ok(packets)
    }

    /// Returns a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Consumes the reader and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writer for PKT-LINE framed output.
pub struct PktLineWriter<W> {
    writer: W,
}

impl<W: Write> PktLineWriter<W> {
    /// Creates a new pkt-line writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a packet.
    pub fn write(&mut self, pkt: &PktLine) -> Result<()> {
        self.writer.write_all(&pkt.encode())?;
        Ok(())
    }

    /// Writes a data line.
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.write(&PktLine::Data(data.to_vec()))
    }

    /// Writes a string line (appending a newline if one isn't present).
    pub fn write_line(&mut self, s: &str) -> Result<()> {
        let mut data = s.as_bytes().to_vec();
        if !s.ends_with('\n') {
            data.push(b'\n');
        }
        self.write(&PktLine::Data(data))
    }

    /// Writes a flush packet.
    pub fn flush_pkt(&mut self) -> Result<()> {
        self.write(&PktLine::Flush)
    }

    /// Writes raw bytes with no PKT-LINE framing (used for the packfile).
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        Ok(())
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    proptest! {
        /// Property: any data line survives an encode/decode roundtrip.
        #[test]
        fn prop_data_roundtrip(data in prop::collection::vec(any::<u8>(), 0..2000)) {
            let pkt = PktLine::Data(data.clone());
            let encoded = pkt.encode();

            let mut reader = PktLineReader::new(Cursor::new(encoded));
            let decoded = reader.read().unwrap().unwrap();
            prop_assert_eq!(decoded, PktLine::Data(data));
        }

        /// Property: decoding never panics on arbitrary bytes.
        #[test]
        fn prop_decode_no_panic(data in prop::collection::vec(any::<u8>(), 0..4096)) {
            let mut reader = PktLineReader::new(Cursor::new(data));
            loop {
                match reader.read() {
                    Ok(Some(PktLine::Pack(_))) | Ok(None) => break,
                    Ok(Some(_)) => continue,
                    Err(_) => break,
                }
            }
        }
    }
}
