//! Core byte-level primitives
//!
//! - DTD: general entity declarations from the internal subset
//! - Encoding: BOM handling and UTF-16 conversion to UTF-8
//! - Scanner: memchr-based search for safe chunk boundaries, XML name rules

pub mod dtd;
pub mod encoding;
pub mod scanner;
