//! Clubroom domain core.
//!
//! Pure, I/O-free building blocks shared by the storage, gacha, and API
//! crates: reward tables, the weighted draw engine, resource key derivation,
//! and the common error type.

pub mod draw_config;
pub mod draw_engine;
pub mod error;
pub mod rarity;
pub mod resource_key;
pub mod types;
