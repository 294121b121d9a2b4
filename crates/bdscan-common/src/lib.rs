//! Bdscan-Common: Shared constants and utilities.
//!
//! This crate provides common functionality used across bdscan:
//!
//! - **Catalog Keys**: The single normalization rule for disc file identity
//! - **Extension Variants**: Ordered extension spellings per disc file kind
//! - **Cancellation**: A cooperative cancellation flag for long scans
//!
//! # Examples
//!
//! ```
//! use bdscan_common::paths::{catalog_key, CLIP_INFO_EXTENSIONS};
//! use bdscan_common::CancelToken;
//!
//! assert_eq!(catalog_key("00001.clpi"), "00001.CLPI");
//! assert_eq!(CLIP_INFO_EXTENSIONS[0], "clpi");
//!
//! let token = CancelToken::new();
//! assert!(!token.is_cancelled());
//! ```

pub mod cancel;
pub mod paths;

pub use cancel::CancelToken;
