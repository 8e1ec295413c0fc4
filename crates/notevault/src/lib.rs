//! # NoteVault Architecture
//!
//! NoteVault is a **durable note store**. It keeps a whole collection of notes
//! as one envelope in a key/value medium and makes sure that envelope
//! survives bad writes, bit rot, old clients and a full disk.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  NoteVault (store/)                                         │
//! │  - save / load / delete, one lock per operation             │
//! │  - backups, recovery chain, quota checks                    │
//! └─────────────────────────────────────────────────────────────┘
//!          │                 │                   │
//!          ▼                 ▼                   ▼
//! ┌────────────────┐ ┌────────────────┐ ┌──────────────────────┐
//! │ validation     │ │ codec          │ │ migration            │
//! │ checksum       │ │ GZ: / LZ: / raw│ │ 1.0 -> 1.1 -> 2.0    │
//! └────────────────┘ └────────────────┘ └──────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  StorageMedium (medium/)                                    │
//! │  - FsMedium (production), MemMedium (testing)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - A save validates first, backs up second and writes last. It either
//!   completes or leaves the previous envelope and every backup in place.
//! - A load never fails on what it finds in storage. Damaged envelopes fall
//!   through backups, then salvage, then an empty collection.
//! - Nothing in this crate writes to stdout or stderr. Diagnostics go through
//!   the [`log`] facade; the binary decides where they end up.
//!
//! ## Module Overview
//!
//! - [`store`]: The vault and its backup, recovery and quota flows
//! - [`medium`]: Storage abstraction and implementations
//! - [`model`]: Notes, envelopes, encoding metadata, backup records
//! - [`validation`]: Structural checks on candidate notes
//! - [`codec`]: Payload compression
//! - [`checksum`]: Envelope integrity hash
//! - [`migration`]: Schema upgrades for older envelopes
//! - [`config`]: Configuration
//! - [`init`]: Production wiring
//! - [`error`]: Error types

pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod init;
pub mod medium;
pub mod migration;
pub mod model;
pub mod store;
pub mod validation;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use medium::{FsMedium, MemMedium, StorageMedium};
pub use model::Note;
pub use store::NoteVault;
pub use validation::{validate, ValidationReport};
