//! Alfie Passport Core - Shared types library.
//!
//! This crate provides the types shared between the relay binary and the
//! integration tests:
//!
//! - [`CustomerId`] - newtype for Shopify customer identifiers
//! - [`Passport`] - one customer's tasting journal, keyed by roast handle
//! - [`Roast`], [`Entry`], [`EntryDraft`] - the canonical roast record shape
//! - [`normalize`] - upgrade of legacy flat roast records into the
//!   multi-entry shape
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Everything that talks to Postgres or
//! Shopify lives in the relay crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod id;
pub mod passport;
pub mod roast;

pub use id::CustomerId;
pub use passport::Passport;
pub use roast::{Entry, EntryDraft, RawRoast, Roast, normalize};
