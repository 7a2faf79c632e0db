//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the catalog persistence backends and the asset storage client.

pub mod persistence;
pub mod storage;
