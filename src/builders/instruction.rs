use base64::prelude::*;
use serde::Deserialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use std::str::FromStr;

use crate::executor::errors::ExecutionError;

/// 账户在指令中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    WritableSigner,
    ReadonlySigner,
    Writable,
    Readonly,
}

impl AccountRole {
    pub fn from_flags(is_signer: bool, is_writable: bool) -> Self {
        match (is_signer, is_writable) {
            (true, true) => AccountRole::WritableSigner,
            (true, false) => AccountRole::ReadonlySigner,
            (false, true) => AccountRole::Writable,
            (false, false) => AccountRole::Readonly,
        }
    }

    fn meta(self, pubkey: Pubkey) -> AccountMeta {
        match self {
            AccountRole::WritableSigner => AccountMeta::new(pubkey, true),
            AccountRole::ReadonlySigner => AccountMeta::new_readonly(pubkey, true),
            AccountRole::Writable => AccountMeta::new(pubkey, false),
            AccountRole::Readonly => AccountMeta::new_readonly(pubkey, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    pub pubkey: Pubkey,
    pub role: AccountRole,
}

impl AccountSpec {
    pub fn new(pubkey: Pubkey, role: AccountRole) -> Self {
        Self { pubkey, role }
    }
}

/// 统一的指令描述, 所有协议指令都先落到这里再转换为 `Instruction`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSpec {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountSpec>,
    pub data: Vec<u8>,
}

impl From<InstructionSpec> for Instruction {
    fn from(spec: InstructionSpec) -> Self {
        Instruction {
            program_id: spec.program_id,
            accounts: spec
                .accounts
                .into_iter()
                .map(|account| account.role.meta(account.pubkey))
                .collect(),
            data: spec.data,
        }
    }
}

/// 聚合器返回的指令 JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiInstruction {
    pub program_id: String,
    pub accounts: Vec<ApiAccountMeta>,
    /// base64
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}

fn parse_pubkey(value: &str) -> Result<Pubkey, ExecutionError> {
    Pubkey::from_str(value)
        .map_err(|e| ExecutionError::Serialization(format!("Invalid pubkey '{}': {}", value, e)))
}

impl TryFrom<ApiInstruction> for InstructionSpec {
    type Error = ExecutionError;

    fn try_from(ix: ApiInstruction) -> Result<Self, Self::Error> {
        let accounts = ix
            .accounts
            .iter()
            .map(|meta| Ok(AccountSpec::new(parse_pubkey(&meta.pubkey)?, AccountRole::from_flags(meta.is_signer, meta.is_writable))))
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        let data = BASE64_STANDARD
            .decode(&ix.data)
            .map_err(|e| ExecutionError::Serialization(format!("Invalid instruction data: {}", e)))?;

        Ok(InstructionSpec {
            program_id: parse_pubkey(&ix.program_id)?,
            accounts,
            data,
        })
    }
}
