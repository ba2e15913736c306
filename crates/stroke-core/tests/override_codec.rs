use proptest::collection::btree_map;
use proptest::prelude::*;
use std::collections::BTreeMap;
use stroke_core::overrides::{decode, encode, variant_bits, CodecError, MAGIC, VERSION};
use stroke_core::OverrideTable;

#[test]
fn test_sample_mapping_layout() {
    let mut table = OverrideTable::new();
    table.insert(4, 1);
    table.insert(10, 2);
    let bytes = table.to_bytes().unwrap();
    assert_eq!(bytes, vec![MAGIC, VERSION, 2, 21, 26]);
    assert_eq!(OverrideTable::from_bytes(&bytes).unwrap().variant_for(10), Some(2));
    assert_eq!(OverrideTable::from_bytes(&bytes).unwrap().variant_for(5), None);
}

#[test]
fn test_truncated_and_corrupt_streams() {
    let bytes = encode(&[(1, 1), (1000, 3)], 3).unwrap();
    assert!(matches!(
        decode(&bytes[..bytes.len() - 1]),
        Err(CodecError::UnterminatedVarint)
    ));
    let mut wrong_magic = bytes.clone();
    wrong_magic[0] = 0x00;
    assert!(matches!(decode(&wrong_magic), Err(CodecError::BadMagic(0))));
}

proptest! {
    #[test]
    fn test_round_trip(entries in btree_map(0u32..1_000_000, 0u32..5_000, 0..64)) {
        let max = entries.values().copied().max().unwrap_or(0);
        let pairs: Vec<(u32, u32)> = entries.iter().map(|(&k, &v)| (k, v)).collect();
        let bytes = encode(&pairs, max).unwrap();
        prop_assert_eq!(bytes[2], variant_bits(max));
        prop_assert_eq!(decode(&bytes).unwrap(), entries.clone());

        let table = OverrideTable::from(entries.clone());
        let packed = table.to_compressed().unwrap();
        prop_assert_eq!(OverrideTable::from_bytes(&packed).unwrap(), table);
    }

    #[test]
    fn test_decode_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..48)) {
        let _ = decode(&bytes);
        let _ = OverrideTable::from_bytes(&bytes);
    }
}

#[test]
fn test_from_map_matches_inserts() {
    let map = BTreeMap::from([(3, 7), (9, 1)]);
    let mut table = OverrideTable::new();
    table.insert(9, 1);
    table.insert(3, 7);
    assert_eq!(OverrideTable::from(map), table);
    assert_eq!(table.max_variant(), 7);
}
