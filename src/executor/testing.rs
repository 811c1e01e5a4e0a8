//! 测试用的链、签名器、中继和构建器替身

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::VersionedTransaction,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::executor::{
    errors::ExecutionError,
    relay_client::{BundleRelay, BundleStatus, InflightBundleStatus},
    traits::{ChainClient, ComboParams, ComboTransactionBuilders, SignatureOutcome, SwapTransaction, TransactionSigner},
    transaction_builder::compile_unsigned_transaction,
};

pub fn transfer_transaction(payer: &Pubkey, blockhash: Hash) -> VersionedTransaction {
    let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 1_000);
    compile_unsigned_transaction(payer, &[ix], blockhash).unwrap()
}

pub fn fake_transaction() -> VersionedTransaction {
    transfer_transaction(&Pubkey::new_unique(), Hash::new_unique())
}

pub struct FakeChain {
    blockhash: Hash,
    last_valid_block_height: u64,
    block_height: AtomicU64,
    send_errors: Mutex<VecDeque<ExecutionError>>,
    status: Mutex<Option<SignatureOutcome>>,
    existing: Mutex<HashSet<Pubkey>>,
    send_calls: AtomicUsize,
    total_calls: AtomicUsize,
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            blockhash: Hash::new_unique(),
            last_valid_block_height: 1_000,
            block_height: AtomicU64::new(0),
            send_errors: Mutex::new(VecDeque::new()),
            status: Mutex::new(Some(SignatureOutcome::Confirmed)),
            existing: Mutex::new(HashSet::new()),
            send_calls: AtomicUsize::new(0),
            total_calls: AtomicUsize::new(0),
        }
    }

    pub fn blockhash(&self) -> Hash {
        self.blockhash
    }

    pub fn push_send_error(&self, error: ExecutionError) {
        self.send_errors.lock().unwrap().push_back(error);
    }

    pub fn set_status(&self, status: Option<SignatureOutcome>) {
        *self.status.lock().unwrap() = status;
    }

    pub fn set_block_height(&self, height: u64) {
        self.block_height.store(height, Ordering::SeqCst);
    }

    pub fn add_account(&self, address: Pubkey) {
        self.existing.lock().unwrap().insert(address);
    }

    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.total_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_latest_blockhash(&self) -> Result<(Hash, u64), ExecutionError> {
        self.touch();
        Ok((self.blockhash, self.last_valid_block_height))
    }

    async fn get_block_height(&self) -> Result<u64, ExecutionError> {
        self.touch();
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn send_transaction(&self, _transaction: &VersionedTransaction) -> Result<Signature, ExecutionError> {
        self.touch();
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        match self.send_errors.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(Signature::new_unique()),
        }
    }

    async fn get_signature_status(&self, _signature: &Signature) -> Result<Option<SignatureOutcome>, ExecutionError> {
        self.touch();
        Ok(self.status.lock().unwrap().clone())
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool, ExecutionError> {
        self.touch();
        Ok(self.existing.lock().unwrap().contains(address))
    }
}

pub struct FakeSigner {
    pubkey: Pubkey,
    reject: bool,
    pub sign_calls: AtomicUsize,
    pub sign_all_calls: AtomicUsize,
}

impl FakeSigner {
    pub fn new() -> Self {
        Self {
            pubkey: Pubkey::new_unique(),
            reject: false,
            sign_calls: AtomicUsize::new(0),
            sign_all_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self { reject: true, ..Self::new() }
    }

    fn sign(&self, mut transaction: VersionedTransaction) -> Result<VersionedTransaction, ExecutionError> {
        if self.reject {
            return Err(ExecutionError::Signature("User rejected the request".to_string()));
        }
        if let Some(first) = transaction.signatures.first_mut() {
            *first = Signature::new_unique();
        }
        Ok(transaction)
    }
}

#[async_trait]
impl TransactionSigner for FakeSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_transaction(&self, transaction: VersionedTransaction) -> Result<VersionedTransaction, ExecutionError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.sign(transaction)
    }

    async fn sign_all_transactions(&self, transactions: Vec<VersionedTransaction>) -> Result<Vec<VersionedTransaction>, ExecutionError> {
        self.sign_all_calls.fetch_add(1, Ordering::SeqCst);
        transactions.into_iter().map(|tx| self.sign(tx)).collect()
    }
}

pub struct FakeRelay {
    pub tip_account: Pubkey,
    send_error: Mutex<Option<ExecutionError>>,
    statuses: Mutex<VecDeque<Option<BundleStatus>>>,
    inflight: Mutex<Option<InflightBundleStatus>>,
    pub sent: Mutex<Vec<Vec<VersionedTransaction>>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        Self {
            tip_account: Pubkey::new_unique(),
            send_error: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
            inflight: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 按顺序返回的状态, 最后一个会一直重复
    pub fn push_status(&self, status: Option<BundleStatus>) {
        self.statuses.lock().unwrap().push_back(status);
    }

    pub fn set_inflight(&self, status: InflightBundleStatus) {
        *self.inflight.lock().unwrap() = Some(status);
    }

    pub fn fail_send(&self, error: ExecutionError) {
        *self.send_error.lock().unwrap() = Some(error);
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn status(confirmation: &str, err: serde_json::Value) -> BundleStatus {
        serde_json::from_value(serde_json::json!({
            "bundle_id": "bundle-1",
            "transactions": [],
            "slot": 100,
            "confirmation_status": confirmation,
            "err": err,
        }))
        .unwrap()
    }
}

#[async_trait]
impl BundleRelay for FakeRelay {
    async fn select_tip_account(&self) -> Result<Pubkey, ExecutionError> {
        Ok(self.tip_account)
    }

    async fn send_bundle(&self, transactions: &[VersionedTransaction]) -> Result<String, ExecutionError> {
        if let Some(error) = self.send_error.lock().unwrap().take() {
            return Err(error);
        }
        self.sent.lock().unwrap().push(transactions.to_vec());
        Ok("bundle-1".to_string())
    }

    async fn get_bundle_status(&self, _bundle_id: &str) -> Result<Option<BundleStatus>, ExecutionError> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().flatten())
        } else {
            Ok(statuses.front().cloned().flatten())
        }
    }

    async fn get_inflight_bundle_status(&self, _bundle_id: &str) -> Result<Option<InflightBundleStatus>, ExecutionError> {
        Ok(self.inflight.lock().unwrap().clone())
    }
}

/// 可注入失败的组合构建器
pub struct FakeComboBuilders {
    /// swap 使用的区块哈希 (bundle共享)
    pub swap_blockhash: Hash,
    pub expected_output: u64,
    pub fail_on: Option<(&'static str, &'static str)>,
    pub oversized: Option<&'static str>,
    /// tip 构建器忽略共享区块哈希
    pub tip_ignores_shared: bool,
    pub shared_seen: Mutex<Vec<(&'static str, Option<Hash>)>>,
}

impl FakeComboBuilders {
    pub fn new() -> Self {
        Self {
            swap_blockhash: Hash::new_unique(),
            expected_output: 75_000_000,
            fail_on: None,
            oversized: None,
            tip_ignores_shared: false,
            shared_seen: Mutex::new(Vec::new()),
        }
    }

    fn make(&self, name: &'static str, payer: Pubkey, shared: Option<Hash>) -> Result<VersionedTransaction, ExecutionError> {
        self.shared_seen.lock().unwrap().push((name, shared));
        if let Some((failing, message)) = self.fail_on {
            if failing == name {
                return Err(ExecutionError::Build(message.to_string()));
            }
        }

        let blockhash = shared.unwrap_or_else(Hash::new_unique);
        if self.oversized == Some(name) {
            let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[1u8; 1300], vec![]);
            return compile_unsigned_transaction(&payer, &[ix], blockhash);
        }
        Ok(transfer_transaction(&payer, blockhash))
    }
}

#[async_trait]
impl ComboTransactionBuilders for FakeComboBuilders {
    async fn build_swap(&self, payer: Pubkey, _params: &ComboParams) -> Result<SwapTransaction, ExecutionError> {
        let transaction = self.make("swap", payer, Some(self.swap_blockhash))?;
        Ok(SwapTransaction { transaction, expected_output: self.expected_output })
    }

    async fn build_short(&self, payer: Pubkey, _params: &ComboParams, shared: Option<Hash>) -> Result<VersionedTransaction, ExecutionError> {
        self.make("short", payer, shared)
    }

    async fn build_transfer(&self, payer: Pubkey, _params: &ComboParams, shared: Option<Hash>) -> Result<VersionedTransaction, ExecutionError> {
        self.make("transfer", payer, shared)
    }

    async fn build_tip(&self, payer: Pubkey, _tip_account: Pubkey, _lamports: u64, shared: Option<Hash>) -> Result<VersionedTransaction, ExecutionError> {
        let shared = if self.tip_ignores_shared { None } else { shared };
        self.make("tip", payer, shared)
    }
}

pub fn combo_params() -> ComboParams {
    ComboParams {
        swap_amount: 0.5,
        short_size: 10.0,
        transfer_amount: 5.0,
        recipient: Pubkey::new_unique(),
        collateral_deposit: Some(0.0),
        slippage_bps: None,
        tip_lamports: Some(10_000),
    }
}
