//! Binary Mapper Module
//!
//! Versioned, self-describing persistence for the symbol table and reflex
//! store. Little-endian throughout, `BCMAPBIN` magic, version 3 written,
//! versions 2 and 3 read (v2 has no flags word: every reflex implicitly
//! carries a vector and no symbol id). Canonical extension: `.bcmap`.

mod codec;

pub use codec::{
    default_mapper_path, load_bytes, load_file, save_bytes, save_file, MapperError, MAGIC,
    VERSION_V2, VERSION_V3,
};
