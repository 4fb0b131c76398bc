//! In-memory account directory used as the identity verifier.

use std::collections::HashMap;

use async_trait::async_trait;
use egide_jwt::{AuthRequest, BoxError, Claims, IdentityDecision, IdentityVerifier};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Account known to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Account {
    /// Token subject.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Revoked accounts are refused even with a valid token.
    #[serde(default, skip_serializing)]
    pub revoked: bool,
}

/// Maps token subjects to accounts.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    accounts: HashMap<String, Account>,
}

impl Directory {
    /// Builds a directory; later entries replace earlier ones with the same subject.
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.sub.clone(), account))
                .collect(),
        }
    }

    /// Number of accounts.
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// True if the directory holds no account.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn decide(&self, claims: &Claims) -> IdentityDecision<Account> {
        let Some(sub) = claims.sub() else {
            return IdentityDecision::not_found("token has no subject");
        };
        match self.accounts.get(sub) {
            Some(account) if account.revoked => {
                debug!(sub, "Account revoked");
                IdentityDecision::not_found("user revoked")
            },
            Some(account) => IdentityDecision::found(account.clone()),
            None => {
                debug!(sub, "Unknown account");
                IdentityDecision::not_found("unknown user")
            },
        }
    }
}

#[async_trait]
impl IdentityVerifier for Directory {
    type Identity = Account;

    async fn verify(
        &self,
        _request: Option<&AuthRequest>,
        claims: Claims,
    ) -> Result<IdentityDecision<Account>, BoxError> {
        Ok(self.decide(&claims))
    }
}
