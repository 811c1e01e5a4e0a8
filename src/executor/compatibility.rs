use base64::prelude::*;
use serde::Serialize;
use solana_sdk::transaction::VersionedTransaction;

use crate::constant::limits::MAX_TRANSACTION_SIZE;

/// 中继兼容性检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub compatible: bool,
    /// 序列化后的字节数
    pub size: usize,
    pub reason: Option<String>,
}

impl CompatibilityReport {
    fn rejected(size: usize, reason: impl Into<String>) -> Self {
        Self { compatible: false, size, reason: Some(reason.into()) }
    }
}

/// 检查交易能否原样提交给中继
///
/// 依次验证: bincode -> base64 -> bincode 往返后字节一致、大小不超过单包上限、
/// 未使用地址查找表。不修改传入的交易。
pub fn check_relay_compatibility(transaction: &VersionedTransaction) -> CompatibilityReport {
    let serialized = match bincode::serialize(transaction) {
        Ok(bytes) => bytes,
        Err(e) => return CompatibilityReport::rejected(0, format!("serialization failed: {}", e)),
    };
    let size = serialized.len();

    let encoded = BASE64_STANDARD.encode(&serialized);
    let decoded = match BASE64_STANDARD.decode(encoded.as_bytes()) {
        Ok(bytes) => bytes,
        Err(e) => return CompatibilityReport::rejected(size, format!("base64 decode failed: {}", e)),
    };

    let roundtrip: VersionedTransaction = match bincode::deserialize(&decoded) {
        Ok(tx) => tx,
        Err(e) => return CompatibilityReport::rejected(size, format!("deserialization failed: {}", e)),
    };

    match bincode::serialize(&roundtrip) {
        Ok(bytes) if bytes == serialized => {}
        Ok(_) => return CompatibilityReport::rejected(size, "round-trip serialization is not byte-identical"),
        Err(e) => return CompatibilityReport::rejected(size, format!("re-serialization failed: {}", e)),
    }

    if size > MAX_TRANSACTION_SIZE {
        return CompatibilityReport::rejected(
            size,
            format!("transaction is {} bytes, exceeds {} byte limit", size, MAX_TRANSACTION_SIZE),
        );
    }

    if transaction
        .message
        .address_table_lookups()
        .map_or(false, |lookups| !lookups.is_empty())
    {
        return CompatibilityReport::rejected(size, "transaction uses address lookup tables");
    }

    CompatibilityReport { compatible: true, size, reason: None }
}

/// 从base64文本解析并检查 (CLI诊断用)
pub fn check_base64_transaction(encoded: &str) -> CompatibilityReport {
    let bytes = match BASE64_STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => return CompatibilityReport::rejected(0, format!("invalid base64: {}", e)),
    };
    match bincode::deserialize::<VersionedTransaction>(&bytes) {
        Ok(tx) => check_relay_compatibility(&tx),
        Err(e) => CompatibilityReport::rejected(bytes.len(), format!("not a transaction: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::transaction_builder::compile_unsigned_transaction;
    use solana_sdk::{
        hash::Hash,
        instruction::Instruction,
        message::{v0, v0::MessageAddressTableLookup, MessageHeader, VersionedMessage},
        pubkey::Pubkey,
        signature::Signature,
        system_instruction,
    };

    fn small_transaction() -> VersionedTransaction {
        let payer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &Pubkey::new_unique(), 10_000);
        compile_unsigned_transaction(&payer, &[ix], Hash::new_unique()).unwrap()
    }

    #[test]
    fn test_small_transaction_is_compatible() {
        let tx = small_transaction();
        let before = bincode::serialize(&tx).unwrap();

        let report = check_relay_compatibility(&tx);

        assert!(report.compatible, "普通转账应兼容: {:?}", report.reason);
        assert_eq!(report.size, before.len());
        assert_eq!(bincode::serialize(&tx).unwrap(), before, "检查不应修改交易");
    }

    #[test]
    fn test_oversized_transaction_is_rejected() {
        let payer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[7u8; 1300], vec![]);
        let tx = compile_unsigned_transaction(&payer, &[ix], Hash::new_unique()).unwrap();

        let report = check_relay_compatibility(&tx);

        assert!(!report.compatible);
        assert!(report.size > MAX_TRANSACTION_SIZE);
        assert!(report.reason.unwrap().contains("byte limit"));
    }

    #[test]
    fn test_lookup_table_transaction_is_rejected() {
        let payer = Pubkey::new_unique();
        let message = v0::Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 0,
            },
            account_keys: vec![payer],
            recent_blockhash: Hash::new_unique(),
            instructions: vec![],
            address_table_lookups: vec![MessageAddressTableLookup {
                account_key: Pubkey::new_unique(),
                writable_indexes: vec![0],
                readonly_indexes: vec![],
            }],
        };
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };

        let report = check_relay_compatibility(&tx);

        assert!(!report.compatible, "使用查找表的交易应被拒绝");
        assert!(report.reason.unwrap().contains("lookup tables"));
    }

    #[test]
    fn test_base64_diagnostic() {
        let tx = small_transaction();
        let encoded = BASE64_STANDARD.encode(bincode::serialize(&tx).unwrap());

        assert!(check_base64_transaction(&encoded).compatible);
        assert!(!check_base64_transaction("not-base64!!").compatible);
    }
}
