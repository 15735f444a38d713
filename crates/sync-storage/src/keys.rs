//! Key encoding and decoding for the storage layer.
//!
//! Record key: `{doc_type}\0{id}` where `{id}` sorts the same way as
//! [`RecordId`]: a tag byte (`0x01` integers, `0x02` strings) followed by
//! the sign-flipped big-endian integer or the raw UTF-8 string.
//!
//! Metadata key: `{doc_type}\0{owner_json}\0{meta_id}` so all rows of one
//! owner share a prefix and come back in metadata id order.

use sync_types::RecordId;

use crate::error::StorageError;

const SEP: u8 = 0x00;
const TAG_INT: u8 = 0x01;
const TAG_STR: u8 = 0x02;

/// Encode an id so that byte order matches `RecordId` order.
pub fn encode_id(id: &RecordId) -> Vec<u8> {
    match id {
        RecordId::Int(n) => {
            let mut out = Vec::with_capacity(9);
            out.push(TAG_INT);
            out.extend_from_slice(&((*n as u64) ^ (1 << 63)).to_be_bytes());
            out
        }
        RecordId::Str(s) => {
            let mut out = Vec::with_capacity(s.len() + 1);
            out.push(TAG_STR);
            out.extend_from_slice(s.as_bytes());
            out
        }
    }
}

/// Decode an id produced by [`encode_id`].
pub fn decode_id(bytes: &[u8]) -> Result<RecordId, StorageError> {
    match bytes.split_first() {
        Some((&TAG_INT, rest)) => {
            let raw: [u8; 8] = rest.try_into().map_err(|_| {
                StorageError::Key(format!("Invalid integer id length: {}", rest.len()))
            })?;
            Ok(RecordId::Int((u64::from_be_bytes(raw) ^ (1 << 63)) as i64))
        }
        Some((&TAG_STR, rest)) => {
            let s = std::str::from_utf8(rest)
                .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
            Ok(RecordId::Str(s.to_string()))
        }
        Some((tag, _)) => Err(StorageError::Key(format!("Unknown id tag: {:#04x}", tag))),
        None => Err(StorageError::Key("Empty id".to_string())),
    }
}

fn type_prefix(doc_type: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(doc_type.len() + 1);
    out.extend_from_slice(doc_type.as_bytes());
    out.push(SEP);
    out
}

/// Key for a content record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub doc_type: String,
    pub id: RecordId,
}

impl RecordKey {
    pub fn new(doc_type: impl Into<String>, id: RecordId) -> Self {
        Self {
            doc_type: doc_type.into(),
            id,
        }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = type_prefix(&self.doc_type);
        out.extend(encode_id(&self.id));
        out
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let sep = bytes
            .iter()
            .position(|b| *b == SEP)
            .ok_or_else(|| StorageError::Key("Missing type separator".to_string()))?;
        let doc_type = std::str::from_utf8(&bytes[..sep])
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        Ok(Self {
            doc_type: doc_type.to_string(),
            id: decode_id(&bytes[sep + 1..])?,
        })
    }

    /// Prefix shared by every record of a type
    pub fn prefix(doc_type: &str) -> Vec<u8> {
        type_prefix(doc_type)
    }

    /// Smallest key strictly greater than every record key of a type
    pub fn upper_bound(doc_type: &str) -> Vec<u8> {
        let mut out = doc_type.as_bytes().to_vec();
        out.push(SEP + 1);
        out
    }
}

/// Key for a metadata row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataKey {
    pub doc_type: String,
    pub owner: RecordId,
    pub meta_id: RecordId,
}

impl MetadataKey {
    pub fn new(doc_type: impl Into<String>, owner: RecordId, meta_id: RecordId) -> Self {
        Self {
            doc_type: doc_type.into(),
            owner,
            meta_id,
        }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Self::owner_prefix(&self.doc_type, &self.owner);
        out.extend(encode_id(&self.meta_id));
        out
    }

    /// Prefix shared by every metadata row of one owner
    pub fn owner_prefix(doc_type: &str, owner: &RecordId) -> Vec<u8> {
        let mut out = type_prefix(doc_type);
        // JSON never contains a raw NUL, so the separator stays unambiguous.
        out.extend_from_slice(owner.to_value().to_string().as_bytes());
        out.push(SEP);
        out
    }
}

/// Key for the metadata id -> owner lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaOwnerKey {
    pub doc_type: String,
    pub meta_id: RecordId,
}

impl MetaOwnerKey {
    pub fn new(doc_type: impl Into<String>, meta_id: RecordId) -> Self {
        Self {
            doc_type: doc_type.into(),
            meta_id,
        }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = type_prefix(&self.doc_type);
        out.extend(encode_id(&self.meta_id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_encoding_preserves_order() {
        let ids = vec![
            RecordId::Int(i64::MIN),
            RecordId::Int(-5),
            RecordId::Int(0),
            RecordId::Int(9),
            RecordId::Int(10),
            RecordId::Int(i64::MAX),
            RecordId::Str("a".into()),
            RecordId::Str("ab".into()),
            RecordId::Str("b".into()),
        ];
        let encoded: Vec<Vec<u8>> = ids.iter().map(encode_id).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
    }

    #[test]
    fn test_id_roundtrip() {
        for id in [RecordId::Int(-42), RecordId::Int(7), RecordId::Str("slug".into())] {
            assert_eq!(decode_id(&encode_id(&id)).unwrap(), id);
        }
        assert!(decode_id(&[]).is_err());
        assert!(decode_id(&[0x09, 1]).is_err());
    }

    #[test]
    fn test_record_key_roundtrip() {
        let key = RecordKey::new("comment", RecordId::Int(25));
        let decoded = RecordKey::from_bytes(&key.to_bytes()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_record_keys_stay_within_bounds() {
        let prefix = RecordKey::prefix("comment");
        let upper = RecordKey::upper_bound("comment");
        let key = RecordKey::new("comment", RecordId::Str("zzz".into())).to_bytes();
        let other = RecordKey::new("commentx", RecordId::Int(1)).to_bytes();

        assert!(key.starts_with(&prefix));
        assert!(key < upper);
        assert!(other > upper);
    }

    #[test]
    fn test_metadata_owner_prefix_is_not_ambiguous() {
        let seven = MetadataKey::new("comment", RecordId::Int(7), RecordId::Int(1)).to_bytes();
        let seventy_prefix = MetadataKey::owner_prefix("comment", &RecordId::Int(70));
        assert!(!seven.starts_with(&seventy_prefix));
        assert!(seven.starts_with(&MetadataKey::owner_prefix("comment", &RecordId::Int(7))));
    }
}
