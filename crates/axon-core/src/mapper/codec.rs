//! Mapper Codec
//!
//! Layout: magic | u32 version | u32 dim | u64 symbol_count |
//! u64 reflex_count | symbols | reflexes. Strings are u32-length-prefixed
//! UTF-8; vectors are dim × f32. All bounds are checked before any
//! allocation sized from the wire.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::reflex::{ReflexEntry, ReflexStore};
use crate::symbols::{SymbolSpace, NO_SYMBOL_ID};
use crate::tensor::{l2_normalize, Tensor, MAX_DIMENSION};

// ============================================================================
// CONSTANTS
// ============================================================================

/// File magic.
pub const MAGIC: &[u8; 8] = b"BCMAPBIN";

/// Legacy version: implicit has_vector, no symbol id.
pub const VERSION_V2: u32 = 2;

/// Current version: per-reflex flags word.
pub const VERSION_V3: u32 = 3;

/// Most symbols or reflexes a file may declare.
const MAX_COUNT: u64 = 100_000_000;

/// Most metadata pairs one reflex may declare.
const MAX_META_COUNT: u32 = 1_000_000;

/// Longest permitted string payload.
const MAX_STRING_LEN: u32 = 16 * 1024 * 1024;

const FLAG_HAS_VECTOR: u32 = 1 << 0;
const FLAG_HAS_SYMBOL_ID: u32 = 1 << 1;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Mapper error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// File does not start with the mapper magic
    #[error("invalid mapper magic")]
    InvalidMagic,
    /// Version is neither 2 nor 3
    #[error("unsupported mapper version: {0}")]
    UnsupportedVersion(u32),
    /// Dimension is zero (with content) or above the ceiling
    #[error("invalid mapper dimension: {0}")]
    InvalidDim(u32),
    /// symbol_count or reflex_count exceeds the bound
    #[error("mapper count too large: {0}")]
    CountTooLarge(u64),
    /// meta_count exceeds the bound
    #[error("mapper meta count too large: {0}")]
    MetaCountTooLarge(u32),
    /// A string length prefix exceeds the bound
    #[error("string length exceeded: {0}")]
    StringLengthExceeded(u32),
    /// Truncated or malformed payload
    #[error("mapper read failed: {0}")]
    ReadFailed(String),
    /// Filesystem write failure
    #[error("mapper write failed: {0}")]
    WriteFailed(String),
    /// Filesystem open failure
    #[error("mapper open failed: {0}")]
    OpenFailed(String),
}

impl MapperError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            MapperError::InvalidMagic => "invalid_mapper_magic",
            MapperError::UnsupportedVersion(_) => "mapper_version_unsupported",
            MapperError::InvalidDim(_) => "invalid_mapper_dim",
            MapperError::CountTooLarge(_) => "mapper_count_too_large",
            MapperError::MetaCountTooLarge(_) => "mapper_meta_count_too_large",
            MapperError::StringLengthExceeded(_) => "string_length_exceeded",
            MapperError::ReadFailed(_) => "mapper_read_failed",
            MapperError::WriteFailed(_) => "write_failed",
            MapperError::OpenFailed(_) => "open_failed",
        }
    }
}

// ============================================================================
// WRITER
// ============================================================================

fn put_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(buffer: &mut Vec<u8>, value: u64) {
    buffer.extend_from_slice(&value.to_le_bytes());
}

fn put_string(buffer: &mut Vec<u8>, value: &str) {
    put_u32(buffer, value.len() as u32);
    buffer.extend_from_slice(value.as_bytes());
}

/// Serialize the symbol table and reflex store to version-3 bytes.
pub fn save_bytes(symbols: &SymbolSpace, reflexes: &ReflexStore) -> Vec<u8> {
    let dim = symbols.dimension().unwrap_or(0) as u32;
    let symbol_entries = symbols.snapshot();
    let mut reflex_entries = reflexes.snapshot();
    reflex_entries.sort_by(|a, b| a.id.cmp(&b.id));

    let mut buffer = Vec::new();
    buffer.extend_from_slice(MAGIC);
    put_u32(&mut buffer, VERSION_V3);
    put_u32(&mut buffer, dim);
    put_u64(&mut buffer, symbol_entries.len() as u64);
    put_u64(&mut buffer, reflex_entries.len() as u64);

    for (token, vector) in &symbol_entries {
        put_string(&mut buffer, token);
        buffer.extend_from_slice(&vector.to_le_bytes());
    }

    for entry in &reflex_entries {
        put_string(&mut buffer, &entry.id);

        // Vectors of foreign dimension cannot travel in this layout.
        let vector = entry
            .vector
            .as_ref()
            .filter(|v| v.len() == dim as usize && dim > 0);
        if entry.vector.is_some() && vector.is_none() {
            tracing::warn!(reflex = %entry.id, "reflex vector dropped on save: dimension mismatch");
        }

        let mut flags = 0u32;
        if vector.is_some() {
            flags |= FLAG_HAS_VECTOR;
        }
        if entry.symbol_id != NO_SYMBOL_ID {
            flags |= FLAG_HAS_SYMBOL_ID;
        }
        put_u32(&mut buffer, flags);
        if let Some(v) = vector {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        if entry.symbol_id != NO_SYMBOL_ID {
            put_u32(&mut buffer, entry.symbol_id);
        }

        put_u32(&mut buffer, entry.meta.len() as u32);
        for (key, value) in &entry.meta {
            put_string(&mut buffer, key);
            put_string(&mut buffer, value);
        }
    }

    buffer
}

/// Serialize to a `.bcmap` file.
pub fn save_file(
    symbols: &SymbolSpace,
    reflexes: &ReflexStore,
    path: &Path,
) -> Result<(), MapperError> {
    let bytes = save_bytes(symbols, reflexes);
    std::fs::write(path, &bytes).map_err(|e| MapperError::WriteFailed(e.to_string()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "mapper saved");
    Ok(())
}

// ============================================================================
// READER
// ============================================================================

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], MapperError> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                MapperError::ReadFailed(format!("truncated at offset {}", self.offset))
            })?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32, MapperError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, MapperError> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn string(&mut self) -> Result<String, MapperError> {
        let len = self.u32()?;
        if len > MAX_STRING_LEN {
            return Err(MapperError::StringLengthExceeded(len));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| MapperError::ReadFailed("string is not UTF-8".to_string()))
    }

    fn vector(&mut self, dim: usize) -> Result<Tensor, MapperError> {
        let bytes = self.take(dim * 4)?;
        Tensor::from_le_bytes(bytes)
            .ok_or_else(|| MapperError::ReadFailed("vector bytes misaligned".to_string()))
    }
}

/// Deserialize stores from bytes. An empty input yields empty stores at
/// `requested_dim`.
pub fn load_bytes(
    bytes: &[u8],
    requested_dim: usize,
) -> Result<(SymbolSpace, ReflexStore), MapperError> {
    if bytes.is_empty() {
        return Ok((SymbolSpace::with_dimension(requested_dim), ReflexStore::new()));
    }

    let mut reader = Reader::new(bytes);
    if reader.take(MAGIC.len())? != MAGIC {
        return Err(MapperError::InvalidMagic);
    }
    let version = reader.u32()?;
    if version != VERSION_V2 && version != VERSION_V3 {
        return Err(MapperError::UnsupportedVersion(version));
    }

    let dim = reader.u32()?;
    let symbol_count = reader.u64()?;
    let reflex_count = reader.u64()?;
    if symbol_count > MAX_COUNT {
        return Err(MapperError::CountTooLarge(symbol_count));
    }
    if reflex_count > MAX_COUNT {
        return Err(MapperError::CountTooLarge(reflex_count));
    }
    if dim as usize > MAX_DIMENSION || (dim == 0 && (symbol_count > 0 || reflex_count > 0)) {
        return Err(MapperError::InvalidDim(dim));
    }

    let effective_dim = if dim == 0 { requested_dim } else { dim as usize };
    let mut symbols = SymbolSpace::with_dimension(effective_dim);
    for _ in 0..symbol_count {
        let token = reader.string()?;
        let vector = reader.vector(dim as usize)?;
        // insert re-normalizes both token and vector
        symbols
            .insert(&token, vector)
            .map_err(|e| MapperError::ReadFailed(e.to_string()))?;
    }

    let mut entries = Vec::with_capacity(reflex_count.min(1024) as usize);
    for _ in 0..reflex_count {
        let id = reader.string()?;
        let (has_vector, has_symbol_id) = if version >= VERSION_V3 {
            let flags = reader.u32()?;
            (flags & FLAG_HAS_VECTOR != 0, flags & FLAG_HAS_SYMBOL_ID != 0)
        } else {
            (true, false)
        };

        let vector = if has_vector {
            Some(l2_normalize(&reader.vector(dim as usize)?))
        } else {
            None
        };
        let symbol_id = if has_symbol_id {
            reader.u32()?
        } else {
            NO_SYMBOL_ID
        };

        let meta_count = reader.u32()?;
        if meta_count > MAX_META_COUNT {
            return Err(MapperError::MetaCountTooLarge(meta_count));
        }
        let mut meta = BTreeMap::new();
        for _ in 0..meta_count {
            let key = reader.string()?;
            let value = reader.string()?;
            meta.insert(key, value);
        }
        meta.entry("stability".to_string())
            .or_insert_with(|| "0".to_string());

        entries.push(ReflexEntry {
            id: id.trim().to_lowercase(),
            vector,
            symbol_id,
            meta,
        });
    }

    let mut reflexes = ReflexStore::new();
    reflexes.replace_all(entries);
    Ok((symbols, reflexes))
}

/// Deserialize stores from a `.bcmap` file.
pub fn load_file(
    path: &Path,
    requested_dim: usize,
) -> Result<(SymbolSpace, ReflexStore), MapperError> {
    let bytes = std::fs::read(path).map_err(|e| MapperError::OpenFailed(e.to_string()))?;
    load_bytes(&bytes, requested_dim)
}

/// Platform default location for the mapper file.
pub fn default_mapper_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("com", "zeroaltitude", "axon") {
        return dirs.data_dir().join("axon.bcmap");
    }
    PathBuf::from("axon.bcmap")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{cosine_similarity, random_hypervector};

    fn meta(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn populated() -> (SymbolSpace, ReflexStore) {
        let mut symbols = SymbolSpace::with_dimension(32);
        for token in ["alpha", "beta", "gamma"] {
            symbols.resolve(token).unwrap();
        }
        let alpha_id = symbols.ordinal_id("alpha").unwrap();

        let mut reflexes = ReflexStore::new();
        reflexes
            .promote(
                "r-direct",
                Some(random_hypervector(32, 9)),
                meta(&[("stability", "0.8"), ("label", "L"), ("sequence_sha1", "s1")]),
                false,
            )
            .unwrap();
        reflexes
            .promote(
                "r-symbol",
                None,
                meta(&[("stability", "0.4"), ("symbol_id", &alpha_id.to_string())]),
                false,
            )
            .unwrap();
        (symbols, reflexes)
    }

    #[test]
    fn test_roundtrip_preserves_everything() {
        let (symbols, reflexes) = populated();
        let bytes = save_bytes(&symbols, &reflexes);
        let (loaded_symbols, loaded_reflexes) = load_bytes(&bytes, 0).unwrap();

        assert_eq!(loaded_symbols.len(), 3);
        assert_eq!(loaded_symbols.dimension(), Some(32));
        for token in ["alpha", "beta", "gamma"] {
            let original = symbols.vector_for_token(token).unwrap();
            let restored = loaded_symbols.vector_for_token(token).unwrap();
            assert!(cosine_similarity(&original, &restored) > 1.0 - 1e-6);
        }

        assert_eq!(loaded_reflexes.len(), 2);
        let direct = loaded_reflexes.get("r-direct").unwrap();
        assert!((direct.stability() - 0.8).abs() < 1e-9);
        assert_eq!(direct.meta.get("label").unwrap(), "L");
        assert_eq!(direct.meta.get("sequence_sha1").unwrap(), "s1");
        assert_eq!(loaded_reflexes.sequence_owner("s1"), Some("r-direct"));

        let via_symbol = loaded_reflexes.get("r-symbol").unwrap();
        assert!(via_symbol.vector.is_none());
        assert_ne!(via_symbol.symbol_id, NO_SYMBOL_ID);
    }

    #[test]
    fn test_empty_input_yields_empty_stores() {
        let (symbols, reflexes) = load_bytes(&[], 512).unwrap();
        assert!(symbols.is_empty());
        assert_eq!(symbols.dimension(), Some(512));
        assert!(reflexes.is_empty());
    }

    #[test]
    fn test_invalid_magic() {
        let err = load_bytes(b"NOTAMAP!rest", 0).unwrap_err();
        assert_eq!(err.code(), "invalid_mapper_magic");
    }

    #[test]
    fn test_unsupported_version() {
        let (symbols, reflexes) = populated();
        let mut bytes = save_bytes(&symbols, &reflexes);
        bytes[8..12].copy_from_slice(&9u32.to_le_bytes());
        let err = load_bytes(&bytes, 0).unwrap_err();
        assert_eq!(err.code(), "mapper_version_unsupported");
    }

    #[test]
    fn test_count_bound_enforced() {
        let (symbols, reflexes) = populated();
        let mut bytes = save_bytes(&symbols, &reflexes);
        bytes[16..24].copy_from_slice(&(MAX_COUNT + 1).to_le_bytes());
        let err = load_bytes(&bytes, 0).unwrap_err();
        assert_eq!(err.code(), "mapper_count_too_large");
    }

    #[test]
    fn test_truncation_is_read_failed() {
        let (symbols, reflexes) = populated();
        let bytes = save_bytes(&symbols, &reflexes);
        let err = load_bytes(&bytes[..bytes.len() - 5], 0).unwrap_err();
        assert_eq!(err.code(), "mapper_read_failed");
    }

    #[test]
    fn test_string_bound_enforced() {
        let (symbols, reflexes) = populated();
        let mut bytes = save_bytes(&symbols, &reflexes);
        // First symbol token length prefix sits right after the header
        // (magic 8 + version 4 + dim 4 + two u64 counts = offset 32).
        bytes[32..36].copy_from_slice(&(MAX_STRING_LEN + 1).to_le_bytes());
        let err = load_bytes(&bytes, 0).unwrap_err();
        assert_eq!(err.code(), "string_length_exceeded");
    }

    #[test]
    fn test_v2_reflexes_implicitly_carry_vectors() {
        // Hand-build a minimal v2 file: one symbol, one reflex without a
        // flags word.
        let dim = 4usize;
        let vector = [0.5f32, 0.5, 0.5, 0.5];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION_V2.to_le_bytes());
        bytes.extend_from_slice(&(dim as u32).to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        // symbol "tok"
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(b"tok");
        for v in vector {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        // reflex "Old-Style" with a vector, zero meta
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(b"Old-Style");
        for v in vector {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let (symbols, reflexes) = load_bytes(&bytes, 0).unwrap();
        assert_eq!(symbols.dimension(), Some(4));
        let entry = reflexes.get("old-style").unwrap();
        assert!(entry.vector.as_ref().unwrap().is_unit(1e-6));
        assert_eq!(entry.symbol_id, NO_SYMBOL_ID);
        // Missing stability defaults to "0".
        assert_eq!(entry.meta.get("stability").unwrap(), "0");
    }

    #[test]
    fn test_save_to_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bcmap");
        let (symbols, reflexes) = populated();

        save_file(&symbols, &reflexes, &path).unwrap();
        let (loaded_symbols, loaded_reflexes) = load_file(&path, 0).unwrap();
        assert_eq!(loaded_symbols.len(), symbols.len());
        assert_eq!(loaded_reflexes.len(), reflexes.len());
    }

    #[test]
    fn test_open_failure_code() {
        let err = load_file(Path::new("/nonexistent/axon.bcmap"), 0).unwrap_err();
        assert_eq!(err.code(), "open_failed");
    }
}
