//! Foundation types for the NataCoin record engine.
//!
//! Every other `nata-*` crate depends on this one. It holds the identifier
//! and address primitives plus the clock abstraction used to stamp records
//! and evaluate voting windows.
//!
//! # Key Types
//!
//! - [`Cid`] - Content identifier (domain-separated BLAKE3 digest)
//! - [`ProposalId`] - Governance proposal identifier (UUID v7)
//! - [`PeerId`] - Random identity of a dissemination node
//! - [`Address`] - Wallet address, compared case-insensitively
//! - [`Clock`] - Seconds-since-epoch time source ([`SystemClock`], [`ManualClock`])

pub mod address;
pub mod cid;
pub mod clock;
pub mod error;
pub mod identity;

pub use address::Address;
pub use cid::Cid;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TypeError;
pub use identity::{PeerId, ProposalId};
