//! Column codecs (§6.1a): the encode/decode pairs declared per Gene Pool
//! table column.
//!
//! Grounded on `examples/original_source/egpcommon/egpcommon/conversions.py`'s
//! `compress_json`/`decompress_json` (zlib+JSON there; `zstd`+`serde_json`
//! here, matching this workspace's existing `gc.rs::compute_signature` use of
//! `zstd` for `meta_data`) and `encode_properties`/`decode_properties`
//! (delegated straight to `egp_common::Properties`, which already owns the
//! bitfield). `ndarray`/`memoryview` conversions from the original are not
//! ported: `GcRow` carries plain `Vec<u8>`/`Vec<i32>` columns, there is no
//! numpy-shaped array boundary in this workspace.

use egp_common::{Properties, TypeUid};

use crate::error::{Result, StoreError};

/// `compress_json` (§6.1a): serialises `value` to JSON then zstd-compresses
/// it, used for the `cgraph` and `meta_data` columns.
pub fn compress_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let raw = serde_json::to_vec(value).map_err(egp_common::CommonError::Json)?;
    zstd::encode_all(raw.as_slice(), 0)
        .map_err(|e| StoreError::Encoding(format!("zstd compression failed: {e}")))
}

/// `decompress_json` (§6.1a): the inverse of [`compress_json`].
pub fn decompress_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let raw = zstd::decode_all(bytes)
        .map_err(|e| StoreError::Encoding(format!("zstd decompression failed: {e}")))?;
    serde_json::from_slice(&raw).map_err(|e| StoreError::Common(egp_common::CommonError::Json(e)))
}

/// `encode_properties` (§6.1a, §6.3): packs a decoded `Properties` into the
/// table's `properties int64` column.
pub fn encode_properties(properties: &Properties) -> i64 {
    properties.encode() as i64
}

/// `decode_properties` (§6.1a, §6.3): the inverse of [`encode_properties`].
pub fn decode_properties(bits: i64) -> Result<Properties> {
    Properties::decode(bits as u64).map_err(StoreError::Common)
}

/// Sorted-unique-UIDs list → the table's `int4[]` columns
/// (`input_types`/`output_types`).
pub fn uids_to_column(uids: &[TypeUid]) -> Vec<i32> {
    uids.iter().map(|u| u.raw()).collect()
}

/// The inverse of [`uids_to_column`].
pub fn column_to_uids(column: &[i32]) -> Vec<TypeUid> {
    column.iter().map(|&raw| TypeUid::from_raw(raw)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use egp_common::{GcType, GraphType, TypeSpecific};

    #[test]
    fn json_compression_round_trips() {
        let value = serde_json::json!({"a": 1, "b": [1, 2, 3]});
        let compressed = compress_json(&value).unwrap();
        let back: serde_json::Value = decompress_json(&compressed).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn properties_round_trip_through_the_column_codec() {
        let p = Properties {
            gc_type: GcType::Ordinary,
            graph_type: GraphType::Standard,
            constant: false,
            deterministic: true,
            abstract_type: false,
            side_effects: false,
            static_creation: false,
            type_specific: TypeSpecific::default(),
        };
        let column = encode_properties(&p);
        assert_eq!(decode_properties(column).unwrap(), p);
    }

    #[test]
    fn uid_column_round_trips() {
        let uids = vec![TypeUid::concrete(0, 1).unwrap(), TypeUid::concrete(0, 2).unwrap()];
        let column = uids_to_column(&uids);
        assert_eq!(column_to_uids(&column), uids);
    }
}
