use async_trait::async_trait;
use log::debug;
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::VersionedTransaction,
};

use crate::executor::{errors::ExecutionError, traits::TransactionSigner};

/// 本地密钥签名器
pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    fn sign(&self, mut transaction: VersionedTransaction) -> Result<VersionedTransaction, ExecutionError> {
        let pubkey = self.keypair.pubkey();
        let required = transaction.message.header().num_required_signatures as usize;
        let index = transaction.message.static_account_keys()
            .iter()
            .take(required)
            .position(|key| *key == pubkey)
            .ok_or_else(|| ExecutionError::Signature(format!("{} is not a required signer", pubkey)))?;

        let signature = self.keypair
            .try_sign_message(&transaction.message.serialize())
            .map_err(|e| ExecutionError::Signature(e.to_string()))?;

        if transaction.signatures.len() < required {
            transaction.signatures.resize(required, Default::default());
        }
        transaction.signatures[index] = signature;
        Ok(transaction)
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, transaction: VersionedTransaction) -> Result<VersionedTransaction, ExecutionError> {
        self.sign(transaction)
    }

    async fn sign_all_transactions(&self, transactions: Vec<VersionedTransaction>) -> Result<Vec<VersionedTransaction>, ExecutionError> {
        debug!("✍️ 批量签名 {} 笔交易", transactions.len());
        transactions.into_iter().map(|tx| self.sign(tx)).collect()
    }
}
