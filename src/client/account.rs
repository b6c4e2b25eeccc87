// Account retrieval - Account number and sequence lookup for signing
use super::{ClientContext, ClientError};
use crate::app::QUERY_ACCOUNT;
use crate::types::{AccountId, BaseAccount};

/// Strategy resolving the on-chain account of an address
pub trait AccountRetriever: Send + Sync {
    fn get_account(&self, ctx: &ClientContext, address: &AccountId) -> Result<BaseAccount, ClientError>;

    fn get_account_number_sequence(
        &self,
        ctx: &ClientContext,
        address: &AccountId,
    ) -> Result<(u64, u64), ClientError> {
        let account = self.get_account(ctx, address)?;
        Ok((account.account_number, account.sequence))
    }

    fn ensure_exists(&self, ctx: &ClientContext, address: &AccountId) -> Result<(), ClientError> {
        self.get_account(ctx, address).map(|_| ())
    }
}

/// Reads accounts through the auth module query route
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthAccountRetriever;

impl AccountRetriever for AuthAccountRetriever {
    fn get_account(&self, ctx: &ClientContext, address: &AccountId) -> Result<BaseAccount, ClientError> {
        let response = ctx.query(QUERY_ACCOUNT, address.as_bytes().to_vec(), 0)?;
        Ok(ctx.codec().unmarshal_json(&response.value)?)
    }
}
