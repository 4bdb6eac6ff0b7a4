//! Core relay functionality
//!
//! This module provides:
//! - Transport layer for the serial link
//! - Line parser for `TIME:<ms>` records
//! - Serial connection lifecycle with retry
//! - Delivery of events to the HTTP collector
//! - The relay loop tying them together

pub mod connection;
pub mod delivery;
pub mod event;
pub mod parser;
pub mod relay;
pub mod transport;
