//! Administrator capability
//!
//! Administrative operations take an `AdminCap` instead of trusting a caller
//! id. A capability is only minted by `Bookie::authorize` and is bound to the
//! engine instance that minted it.

use crate::common::types::AccountId;
use crate::errors::{BookieError, BookieResult};

/// Proof that the holder was authorized as administrator of one engine
///
/// Deliberately not `Clone`: hand out a reference, not a copy.
#[derive(Debug)]
pub struct AdminCap {
    engine_id: u64,
    account: AccountId,
}

impl AdminCap {
    pub(crate) fn mint(engine_id: u64, account: AccountId) -> Self {
        Self { engine_id, account }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// Rejects capabilities minted by another engine instance
    pub(crate) fn check(&self, engine_id: u64) -> BookieResult<()> {
        if self.engine_id != engine_id {
            return Err(BookieError::ForeignCapability);
        }
        Ok(())
    }
}
