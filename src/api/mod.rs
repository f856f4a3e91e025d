//! Public API of erata.
//!
//! This module contains all user-facing types and functions.
//! Most users should only interact with the re-exports at the crate root.

pub mod allocator;
pub mod allocator_impl;
pub mod config;
pub mod record;
pub mod scope;
pub mod stats;
