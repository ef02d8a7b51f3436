//! Typed record payloads for the NataCoin record engine.
//!
//! A [`Record`] is what the content store persists: a proposal text, a
//! property record, or a property attestation, tagged by a `type`
//! discriminator. [`RecordCodec`] turns records into the bytes the store
//! hashes and back.
//!
//! The governance wire types [`Proposal`] and [`Vote`] also live here so
//! that every peer can decode governance announcements without depending on
//! the ledger itself.

pub mod codec;
pub mod error;
pub mod governance;
pub mod record;

pub use codec::RecordCodec;
pub use error::{CodecError, CodecResult};
pub use governance::{Proposal, Vote, DEFAULT_VOTING_DURATION_SECS};
pub use record::{AttestationRecord, PropertyRecord, ProposalRecord, Record, RecordKind};
