//! Co-signing
//!
//! Provides:
//! - Approval requests, responses and signer locators
//! - Matching pending approvals to local key pairs
//! - Positional assembly of signatures into a transaction

pub mod approval;
pub mod coordinator;

pub use approval::{sign_approval, Approval, PendingApproval, SignerLocator};
pub use coordinator::{
    assemble_signed_transaction, match_approvals, AssemblyPolicy, CosignError, SignedTransaction,
    WrappedTransaction,
};
