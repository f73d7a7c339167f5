//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types used by typed property getters
//! - Arena handle types
//! - Dynamic type helpers for trait objects
//! - Logging utilities

pub mod any;
pub mod collections;
pub mod logging;
pub mod math;
