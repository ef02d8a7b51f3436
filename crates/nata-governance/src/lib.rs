//! Governance ledger for the NataCoin record engine.
//!
//! Members open [`Proposal`]s with an inclusive voting window and cast at
//! most one [`Vote`] each per proposal. The ledger only records; results are
//! computed on demand by [`Tally::from_votes`].
//!
//! [`GovernanceService`] ties the ledger to the content store (the proposal
//! text is persisted as a record) and to the dissemination layer (proposals
//! and votes are announced, and peers import them via [`handlers`]).
//!
//! [`Proposal`]: nata_records::Proposal
//! [`Vote`]: nata_records::Vote

pub mod error;
pub mod handlers;
pub mod ledger;
pub mod memory;
pub mod service;
pub mod tally;

pub use error::{GovernanceError, GovernanceResult};
pub use ledger::{GovernanceLedger, ImportOutcome, ProposalDraft};
pub use memory::InMemoryLedger;
pub use service::GovernanceService;
pub use tally::Tally;
