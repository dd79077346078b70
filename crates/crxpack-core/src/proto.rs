//! Hand-rolled protobuf wire codec for the CRX3 header messages.
//!
//! The format only uses three tiny messages, all of whose fields are
//! length-delimited byte blobs, so the codec is a few varint helpers rather
//! than a generated-code dependency. Field numbers follow the published
//! `crx3.proto` schema and must never change:
//!
//! ```text
//! message CrxFileHeader {
//!   repeated AsymmetricKeyProof sha256_with_rsa = 2;
//!   bytes signed_header_data = 10000;
//! }
//! message AsymmetricKeyProof {
//!   bytes public_key = 1;
//!   bytes signature  = 2;
//! }
//! message SignedData {
//!   bytes crx_id = 1;
//! }
//! ```

use crate::error::{PackError, Result};

/// Wire type for length-delimited fields. The CRX3 schema uses no other.
const WIRE_LEN: u64 = 2;

/// Field number of `CrxFileHeader.sha256_with_rsa`.
const FIELD_SHA256_WITH_RSA: u64 = 2;
/// Field number of `CrxFileHeader.signed_header_data`.
const FIELD_SIGNED_HEADER_DATA: u64 = 10000;
/// Field number of `AsymmetricKeyProof.public_key` and `SignedData.crx_id`.
const FIELD_ONE: u64 = 1;
/// Field number of `AsymmetricKeyProof.signature`.
const FIELD_TWO: u64 = 2;

/// One `sha256_with_rsa` entry of the outer header message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProof {
    /// Signing public key, SPKI DER.
    pub public_key: Vec<u8>,
    /// RSASSA-PKCS1-v1_5/SHA-256 signature over the signed message.
    pub signature: Vec<u8>,
}

/// Decoded form of the outer `CrxFileHeader` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// RSA signature records; exactly one for packages we produce.
    pub sha256_with_rsa: Vec<KeyProof>,
    /// Serialized `SignedData` message, covered by every signature.
    pub signed_header_data: Vec<u8>,
}

fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn put_bytes_field(out: &mut Vec<u8>, field: u64, data: &[u8]) {
    put_varint(out, (field << 3) | WIRE_LEN);
    put_varint(out, data.len() as u64);
    out.extend_from_slice(data);
}

/// Encode a `SignedData` message holding the raw 16-byte extension ID.
pub fn encode_signed_data(crx_id: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(crx_id.len() + 2);
    put_bytes_field(&mut out, FIELD_ONE, crx_id);
    out
}

/// Encode the outer `CrxFileHeader` message.
///
/// Fields are written in the same order Chromium's packer emits them:
/// signature records first, then the signed header data.
pub fn encode_file_header(proofs: &[KeyProof], signed_header_data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for proof in proofs {
        let mut entry = Vec::with_capacity(proof.public_key.len() + proof.signature.len() + 8);
        put_bytes_field(&mut entry, FIELD_ONE, &proof.public_key);
        put_bytes_field(&mut entry, FIELD_TWO, &proof.signature);
        put_bytes_field(&mut out, FIELD_SHA256_WITH_RSA, &entry);
    }
    put_bytes_field(&mut out, FIELD_SIGNED_HEADER_DATA, signed_header_data);
    out
}

/// Cursor over a wire-format buffer for decoding.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn done(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        for shift in (0..64).step_by(7) {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| PackError::Malformed("truncated varint".into()))?;
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(PackError::Malformed("varint exceeds 64 bits".into()))
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.varint()? as usize;
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| PackError::Malformed("length-delimited field overruns buffer".into()))?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Skip a field of the given wire type. Only the types protobuf defines.
    fn skip(&mut self, wire_type: u64) -> Result<()> {
        match wire_type {
            0 => {
                self.varint()?;
            }
            1 => self.advance(8)?,
            2 => {
                self.bytes()?;
            }
            5 => self.advance(4)?,
            other => {
                return Err(PackError::Malformed(format!(
                    "unsupported wire type {other}"
                )));
            }
        }
        Ok(())
    }

    fn advance(&mut self, n: usize) -> Result<()> {
        if self.pos + n > self.buf.len() {
            return Err(PackError::Malformed("truncated fixed-width field".into()));
        }
        self.pos += n;
        Ok(())
    }
}

/// Decode a `CrxFileHeader` message, skipping unknown fields (e.g. ECDSA
/// proofs emitted by other packers).
///
/// # Errors
///
/// Returns [`PackError::Malformed`] on truncated or non-protobuf input.
pub fn decode_file_header(buf: &[u8]) -> Result<FileHeader> {
    let mut reader = Reader::new(buf);
    let mut header = FileHeader {
        sha256_with_rsa: Vec::new(),
        signed_header_data: Vec::new(),
    };

    while !reader.done() {
        let tag = reader.varint()?;
        let (field, wire_type) = (tag >> 3, tag & 0x7);
        match (field, wire_type) {
            (FIELD_SHA256_WITH_RSA, WIRE_LEN) => {
                let entry = reader.bytes()?;
                header.sha256_with_rsa.push(decode_key_proof(entry)?);
            }
            (FIELD_SIGNED_HEADER_DATA, WIRE_LEN) => {
                header.signed_header_data = reader.bytes()?.to_vec();
            }
            _ => reader.skip(wire_type)?,
        }
    }

    Ok(header)
}

fn decode_key_proof(buf: &[u8]) -> Result<KeyProof> {
    let mut reader = Reader::new(buf);
    let mut proof = KeyProof {
        public_key: Vec::new(),
        signature: Vec::new(),
    };

    while !reader.done() {
        let tag = reader.varint()?;
        let (field, wire_type) = (tag >> 3, tag & 0x7);
        match (field, wire_type) {
            (FIELD_ONE, WIRE_LEN) => proof.public_key = reader.bytes()?.to_vec(),
            (FIELD_TWO, WIRE_LEN) => proof.signature = reader.bytes()?.to_vec(),
            _ => reader.skip(wire_type)?,
        }
    }

    Ok(proof)
}

/// Decode a `SignedData` message and return the embedded raw extension ID.
///
/// # Errors
///
/// Returns [`PackError::Malformed`] on truncated input.
pub fn decode_signed_data(buf: &[u8]) -> Result<Vec<u8>> {
    let mut reader = Reader::new(buf);
    let mut crx_id = Vec::new();

    while !reader.done() {
        let tag = reader.varint()?;
        let (field, wire_type) = (tag >> 3, tag & 0x7);
        match (field, wire_type) {
            (FIELD_ONE, WIRE_LEN) => crx_id = reader.bytes()?.to_vec(),
            _ => reader.skip(wire_type)?,
        }
    }

    Ok(crx_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_data_layout_is_exact() {
        // field 1, wire type 2, length 16, then the payload verbatim
        let id = [0xabu8; 16];
        let encoded = encode_signed_data(&id);
        assert_eq!(encoded[0], 0x0a);
        assert_eq!(encoded[1], 16);
        assert_eq!(&encoded[2..], &id);
    }

    #[test]
    fn header_tag_for_signed_header_data_is_three_bytes() {
        // (10000 << 3) | 2 = 80002 = varint 82 f1 04
        let encoded = encode_file_header(&[], b"x");
        assert_eq!(&encoded[..3], &[0x82, 0xf1, 0x04]);
    }

    #[test]
    fn file_header_round_trips() {
        let proofs = vec![KeyProof {
            public_key: vec![1, 2, 3],
            signature: vec![4, 5, 6, 7],
        }];
        let signed = encode_signed_data(&[9u8; 16]);
        let encoded = encode_file_header(&proofs, &signed);

        let decoded = decode_file_header(&encoded).unwrap();
        assert_eq!(decoded.sha256_with_rsa, proofs);
        assert_eq!(decoded.signed_header_data, signed);
        assert_eq!(decode_signed_data(&signed).unwrap(), vec![9u8; 16]);
    }

    #[test]
    fn decoder_skips_unknown_fields() {
        // sha256_with_ecdsa (field 3) from some other packer
        let mut buf = Vec::new();
        super::put_bytes_field(&mut buf, 3, &[0xde, 0xad]);
        super::put_bytes_field(&mut buf, 10000, b"payload");

        let decoded = decode_file_header(&buf).unwrap();
        assert!(decoded.sha256_with_rsa.is_empty());
        assert_eq!(decoded.signed_header_data, b"payload");
    }

    #[test]
    fn truncated_input_is_rejected() {
        let signed = encode_signed_data(&[9u8; 16]);
        let encoded = encode_file_header(&[], &signed);
        assert!(decode_file_header(&encoded[..encoded.len() - 1]).is_err());
    }
}
