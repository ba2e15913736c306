//! Variant override codec.
//!
//! Catalog indices whose first variant collided with an earlier level are served a
//! later variant. The index→variant table is shipped as a compact binary:
//!
//! ```text
//! [MAGIC] [VERSION] [variant bits] varint* ...
//! ```
//!
//! Each LEB128 varint packs `(index_delta << variant_bits) | variant`, with deltas
//! taken from a virtual previous index of -1 so every delta is at least 1.
//! Distribution wraps the binary in gzip; readers accept both forms.

use crate::canonical::{canonical_key, CanonicalKey};
use crate::generator::LevelGenerator;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{BTreeMap, HashSet};
use std::io::{Read, Write};
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info};

pub const MAGIC: u8 = 0x5B;
pub const VERSION: u8 = 1;
const HEADER_LEN: usize = 3;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload shorter than the 3-byte header")]
    Truncated,
    #[error("unrecognized magic byte {0:#04x}")]
    BadMagic(u8),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("variant bit width {0} is outside 1..=32")]
    BadBitWidth(u8),
    #[error("indices must be strictly increasing (at index {index})")]
    NonIncreasing { index: u32 },
    #[error("variant {variant} at index {index} does not fit in {bits} bits")]
    VariantTooWide { index: u32, variant: u32, bits: u8 },
    #[error("varint does not fit in 64 bits")]
    VarintOverflow,
    #[error("varint cut off at end of stream")]
    UnterminatedVarint,
    #[error("decoded index exceeds u32 range")]
    IndexOverflow,
    #[error("gzip container: {0}")]
    Io(#[from] std::io::Error),
}

/// Bits needed to store every variant up to `max_variant_used` (at least 1)
pub fn variant_bits(max_variant_used: u32) -> u8 {
    (32 - max_variant_used.leading_zeros()).max(1) as u8
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
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

fn read_varint(bytes: &[u8], pos: &mut usize) -> Result<u64, CodecError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*pos).ok_or(CodecError::UnterminatedVarint)?;
        *pos += 1;
        let chunk = (byte & 0x7f) as u64;
        if shift >= 64 || (shift > 0 && chunk >> (64 - shift) != 0) {
            return Err(CodecError::VarintOverflow);
        }
        value |= chunk << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Encode `(index, variant)` pairs given in strictly increasing index order.
pub fn encode(entries: &[(u32, u32)], max_variant_used: u32) -> Result<Vec<u8>, CodecError> {
    let bits = variant_bits(max_variant_used);
    let mut out = Vec::with_capacity(HEADER_LEN + entries.len() * 2);
    out.extend_from_slice(&[MAGIC, VERSION, bits]);

    let mut prev: i64 = -1;
    for &(index, variant) in entries {
        let delta = index as i64 - prev;
        if delta <= 0 {
            return Err(CodecError::NonIncreasing { index });
        }
        if bits < 32 && variant >> bits != 0 {
            return Err(CodecError::VariantTooWide {
                index,
                variant,
                bits,
            });
        }
        let delta = delta as u64;
        if delta.leading_zeros() < bits as u32 {
            return Err(CodecError::IndexOverflow);
        }
        write_varint(&mut out, (delta << bits) | variant as u64);
        prev = index as i64;
    }
    Ok(out)
}

/// Decode a raw (uncompressed) override payload.
pub fn decode(bytes: &[u8]) -> Result<BTreeMap<u32, u32>, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }
    if bytes[0] != MAGIC {
        return Err(CodecError::BadMagic(bytes[0]));
    }
    if bytes[1] != VERSION {
        return Err(CodecError::UnsupportedVersion(bytes[1]));
    }
    let bits = bytes[2];
    if !(1..=32).contains(&bits) {
        return Err(CodecError::BadBitWidth(bits));
    }
    let mask = (1u64 << bits) - 1;

    let mut out = BTreeMap::new();
    let mut pos = HEADER_LEN;
    let mut prev: i64 = -1;
    while pos < bytes.len() {
        let token = read_varint(bytes, &mut pos)?;
        let delta = (token >> bits) as i64;
        let variant = (token & mask) as u32;
        if delta <= 0 {
            return Err(CodecError::NonIncreasing {
                index: prev.max(0) as u32,
            });
        }
        let index = prev
            .checked_add(delta)
            .and_then(|i| u32::try_from(i).ok())
            .ok_or(CodecError::IndexOverflow)?;
        out.insert(index, variant);
        prev = index as i64;
    }
    Ok(out)
}

/// Wrap a payload in gzip.
pub fn compress(raw: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

/// Unwrap gzip when the magic is present, otherwise return the bytes unchanged.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return Ok(bytes.to_vec());
    }
    let mut decoder = GzDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    Ok(raw)
}

/// Index→variant table, absent indices use the default variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideTable {
    entries: BTreeMap<u32, u32>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: u32, variant: u32) {
        self.entries.insert(index, variant);
    }

    pub fn variant_for(&self, index: u32) -> Option<u32> {
        self.entries.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_variant(&self) -> u32 {
        self.entries.values().copied().max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.entries.iter().map(|(&i, &v)| (i, v))
    }

    /// Raw codec bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let entries: Vec<(u32, u32)> = self.iter().collect();
        encode(&entries, self.max_variant())
    }

    /// Gzip-wrapped codec bytes, the distribution form
    pub fn to_compressed(&self) -> Result<Vec<u8>, CodecError> {
        compress(&self.to_bytes()?)
    }

    /// Read either form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw = decompress(bytes)?;
        Ok(Self {
            entries: decode(&raw)?,
        })
    }
}

impl From<BTreeMap<u32, u32>> for OverrideTable {
    fn from(entries: BTreeMap<u32, u32>) -> Self {
        Self { entries }
    }
}

// ==================== Catalog scan ====================

#[derive(Debug, Error)]
#[error("index {index}: every variant below {probed} collided or failed")]
pub struct ScanError {
    pub index: u32,
    pub probed: u32,
}

/// Result of scanning a catalog range
#[derive(Debug, Clone, Default)]
pub struct CatalogScan {
    pub overrides: OverrideTable,
    /// Canonical keys of every accepted catalog level
    pub keys: HashSet<CanonicalKey>,
}

/// Walk `indices` in order, probing variants until each level's canonical key is
/// new. Non-zero accepted variants become overrides.
pub fn build_overrides(
    generator: &LevelGenerator,
    indices: Range<u32>,
    max_probe: u32,
) -> Result<CatalogScan, ScanError> {
    let mut scan = CatalogScan::default();
    for index in indices {
        let mut accepted = false;
        for variant in 0..max_probe {
            let generated = match generator.generate(index, variant) {
                Ok(g) => g,
                Err(err) => {
                    debug!(%err, "catalog variant skipped");
                    continue;
                }
            };
            let key = canonical_key(&generated.level);
            if !scan.keys.insert(key) {
                debug!(index, variant, "canonical collision");
                continue;
            }
            if variant != 0 {
                scan.overrides.insert(index, variant);
            }
            accepted = true;
            break;
        }
        if !accepted {
            return Err(ScanError {
                index,
                probed: max_probe,
            });
        }
    }
    info!(
        levels = scan.keys.len(),
        overrides = scan.overrides.len(),
        "catalog scan complete"
    );
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_mapping_header_and_tokens() {
        let bytes = encode(&[(4, 1), (10, 2)], 2).unwrap();
        assert_eq!(bytes[0], MAGIC);
        assert_eq!(bytes[1], VERSION);
        assert_eq!(bytes[2], 2);
        // (5 << 2) | 1, (6 << 2) | 2
        assert_eq!(&bytes[3..], &[21, 26]);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, BTreeMap::from([(4, 1), (10, 2)]));
    }

    #[test]
    fn test_bit_width() {
        assert_eq!(variant_bits(0), 1);
        assert_eq!(variant_bits(1), 1);
        assert_eq!(variant_bits(2), 2);
        assert_eq!(variant_bits(255), 8);
        assert_eq!(variant_bits(u32::MAX), 32);
    }

    #[test]
    fn test_encode_rejects_bad_input() {
        assert!(matches!(
            encode(&[(3, 1), (3, 1)], 1),
            Err(CodecError::NonIncreasing { index: 3 })
        ));
        assert!(matches!(
            encode(&[(1, 4)], 3),
            Err(CodecError::VariantTooWide { variant: 4, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_bad_headers() {
        assert!(matches!(decode(&[MAGIC, VERSION]), Err(CodecError::Truncated)));
        assert!(matches!(decode(&[0, VERSION, 2]), Err(CodecError::BadMagic(0))));
        assert!(matches!(
            decode(&[MAGIC, 9, 2]),
            Err(CodecError::UnsupportedVersion(9))
        ));
        assert!(matches!(decode(&[MAGIC, VERSION, 0]), Err(CodecError::BadBitWidth(0))));
    }

    #[test]
    fn test_decode_rejects_zero_delta() {
        // delta 0, variant 1
        assert!(matches!(
            decode(&[MAGIC, VERSION, 2, 1]),
            Err(CodecError::NonIncreasing { .. })
        ));
        assert!(matches!(
            decode(&[MAGIC, VERSION, 2, 0x80]),
            Err(CodecError::UnterminatedVarint)
        ));
    }

    #[test]
    fn test_large_values_use_multibyte_varints() {
        let entries = [(0, 0), (300, 7), (1_000_000, 5)];
        let bytes = encode(&entries, 7).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.into_iter().collect::<Vec<_>>(), entries.to_vec());
    }

    #[test]
    fn test_gzip_detected_transparently() {
        let mut table = OverrideTable::new();
        table.insert(2, 3);
        table.insert(40, 1);
        let raw = table.to_bytes().unwrap();
        let packed = table.to_compressed().unwrap();
        assert_eq!(&packed[..2], &GZIP_MAGIC);
        assert_eq!(OverrideTable::from_bytes(&raw).unwrap(), table);
        assert_eq!(OverrideTable::from_bytes(&packed).unwrap(), table);
    }

    #[test]
    fn test_empty_table() {
        let table = OverrideTable::new();
        let raw = table.to_bytes().unwrap();
        assert_eq!(raw, vec![MAGIC, VERSION, 1]);
        assert!(OverrideTable::from_bytes(&raw).unwrap().is_empty());
    }

    #[test]
    fn test_catalog_scan_keys_are_unique() {
        let generator = LevelGenerator::new();
        let scan = build_overrides(&generator, 0..10, 8).unwrap();
        assert_eq!(scan.keys.len(), 10);
        for (index, variant) in scan.overrides.iter() {
            assert!(index < 10);
            assert!(variant > 0);
        }
    }
}
