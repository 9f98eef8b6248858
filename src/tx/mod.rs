use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::client::{AdminSigner, ChainClient, ExecutionReceipt};
use crate::error::AdminError;
use crate::types::{Address, ObjectId};

/// One argument of a contract call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CallArg {
    /// Reference to an on-chain object (capability, shared state).
    Object(ObjectId),
    /// Plain unsigned integer payload.
    U64(u64),
    /// The value produced by an earlier instruction in the same batch,
    /// addressed by its append index.
    CallResult(u16),
}

/// One instruction of a transaction batch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    MoveCall { target: String, args: Vec<CallArg> },
    TransferObjects { objects: Vec<CallArg>, recipient: Address },
}

/// Serialized form of a batch: what actually gets signed and shipped.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxData {
    pub sender: Address,
    pub gas_price: u64,
    pub gas_budget: u64,
    pub gas_payment: Vec<ObjectId>,
    pub instructions: Vec<Instruction>,
}

impl TxData {
    pub fn to_bytes(&self) -> Result<Vec<u8>, AdminError> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchState {
    Empty,
    Populated,
    Dispatched,
}

/// How a finished batch leaves this process.
pub enum DispatchStrategy<'a> {
    /// Sign with the held admin key and submit for execution.
    Direct(&'a AdminSigner),
    /// Declare the given account as sender without signing and encode the
    /// transaction for out-of-band signature collection.
    External(Address),
}

pub enum DispatchOutcome {
    Executed(ExecutionReceipt),
    Encoded(String),
}

/// Ordered, append-only accumulator of contract-call instructions.
///
/// Instructions execute in exactly the order they were appended; nothing is
/// deduplicated or merged. A batch is consumed by exactly one dispatch —
/// a second dispatch is a caller error, not a silent resubmission.
#[derive(Debug, Default)]
pub struct TxBatch {
    instructions: Vec<Instruction>,
    sender: Option<Address>,
    dispatched: bool,
}

impl TxBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BatchState {
        if self.dispatched {
            BatchState::Dispatched
        } else if self.instructions.is_empty() {
            BatchState::Empty
        } else {
            BatchState::Populated
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Append a contract call and return a handle to its result, usable as
    /// an argument of a later instruction in the same batch.
    pub fn move_call(&mut self, target: impl Into<String>, args: Vec<CallArg>) -> CallArg {
        let index = self.instructions.len() as u16;
        self.instructions.push(Instruction::MoveCall {
            target: target.into(),
            args,
        });
        CallArg::CallResult(index)
    }

    pub fn transfer_objects(&mut self, objects: Vec<CallArg>, recipient: Address) {
        self.instructions
            .push(Instruction::TransferObjects { objects, recipient });
    }

    /// Terminal operation: hand the batch to exactly one dispatch path.
    ///
    /// An empty batch is legal (it yields a zero-instruction transaction);
    /// a second dispatch of the same batch fails with `AlreadyDispatched`.
    /// Stale object references are not checked here — they surface at
    /// submission or on-chain execution.
    pub fn dispatch(
        &mut self,
        strategy: DispatchStrategy<'_>,
        client: &dyn ChainClient,
    ) -> Result<DispatchOutcome, AdminError> {
        if self.dispatched {
            return Err(AdminError::AlreadyDispatched);
        }
        let outcome = match strategy {
            DispatchStrategy::Direct(signer) => {
                self.sender = Some(signer.address()?);
                let tx = self.build_tx_data(client)?;
                let signed = signer.sign(&tx)?;
                DispatchOutcome::Executed(client.execute(&signed)?)
            }
            DispatchStrategy::External(target) => {
                self.sender = Some(target);
                let tx = self.build_tx_data(client)?;
                DispatchOutcome::Encoded(general_purpose::STANDARD.encode(tx.to_bytes()?))
            }
        };
        self.dispatched = true;
        Ok(outcome)
    }

    fn build_tx_data(&self, client: &dyn ChainClient) -> Result<TxData, AdminError> {
        let sender = self
            .sender
            .ok_or_else(|| AdminError::Build("transaction sender not set".into()))?;
        let gas = client.resolve_gas(&sender)?;
        Ok(TxData {
            sender,
            gas_price: gas.price,
            gas_budget: gas.budget,
            gas_payment: gas.payment,
            instructions: self.instructions.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use serde_json::json;

    use crate::client::{SignedTx, DEFAULT_GAS_BUDGET};

    use super::*;

    /// Offline stand-in for the fullnode: fixed gas, canned receipts.
    pub(crate) struct StubClient {
        pub executed: std::cell::RefCell<Vec<SignedTx>>,
    }

    impl StubClient {
        pub fn new() -> Self {
            Self {
                executed: std::cell::RefCell::new(Vec::new()),
            }
        }

        pub fn gas_object() -> ObjectId {
            ObjectId::new([0xaa; 32])
        }
    }

    impl ChainClient for StubClient {
        fn reference_gas_price(&self) -> Result<u64, AdminError> {
            Ok(1_000)
        }

        fn gas_objects(&self, _owner: &Address) -> Result<Vec<ObjectId>, AdminError> {
            Ok(vec![Self::gas_object()])
        }

        fn dry_run(&self, _tx_bytes_b64: &str) -> Result<serde_json::Value, AdminError> {
            Ok(json!({ "effects": { "status": { "status": "success" } } }))
        }

        fn execute(&self, signed: &SignedTx) -> Result<ExecutionReceipt, AdminError> {
            self.executed.borrow_mut().push(signed.clone());
            Ok(ExecutionReceipt {
                digest: "stub-digest".into(),
                status: "success".into(),
                raw: json!({}),
            })
        }
    }

    const SK_HEX: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    fn target_addr() -> Address {
        Address::new([0x42; 32])
    }

    fn decode_tx(b64: &str) -> TxData {
        let bytes = general_purpose::STANDARD.decode(b64).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn batch_walks_empty_populated_dispatched() {
        let client = StubClient::new();
        let mut batch = TxBatch::new();
        assert_eq!(batch.state(), BatchState::Empty);

        batch.move_call("0xabc::admin::noop", vec![]);
        assert_eq!(batch.state(), BatchState::Populated);

        batch
            .dispatch(DispatchStrategy::External(target_addr()), &client)
            .unwrap();
        assert_eq!(batch.state(), BatchState::Dispatched);
    }

    #[test]
    fn empty_batch_dispatch_is_legal_and_carries_zero_instructions() {
        let client = StubClient::new();
        let mut batch = TxBatch::new();
        let outcome = batch
            .dispatch(DispatchStrategy::External(target_addr()), &client)
            .unwrap();
        match outcome {
            DispatchOutcome::Encoded(b64) => {
                let tx = decode_tx(&b64);
                assert!(tx.instructions.is_empty());
            }
            DispatchOutcome::Executed(_) => panic!("external dispatch must encode"),
        }
    }

    #[test]
    fn second_dispatch_is_a_reuse_violation() {
        let client = StubClient::new();
        let mut batch = TxBatch::new();
        batch.move_call("0xabc::admin::noop", vec![]);
        batch
            .dispatch(DispatchStrategy::External(target_addr()), &client)
            .unwrap();
        assert!(matches!(
            batch.dispatch(DispatchStrategy::External(target_addr()), &client),
            Err(AdminError::AlreadyDispatched)
        ));
        assert!(client.executed.borrow().is_empty());
    }

    #[test]
    fn external_dispatch_declares_target_as_sender_and_never_signs() {
        let client = StubClient::new();
        let mut batch = TxBatch::new();
        batch.move_call("0xabc::admin::noop", vec![CallArg::U64(1)]);
        let outcome = batch
            .dispatch(DispatchStrategy::External(target_addr()), &client)
            .unwrap();
        let DispatchOutcome::Encoded(b64) = outcome else {
            panic!("external dispatch must encode");
        };
        let tx = decode_tx(&b64);
        assert_eq!(tx.sender, target_addr());
        assert_eq!(tx.gas_price, 1_000);
        assert_eq!(tx.gas_budget, DEFAULT_GAS_BUDGET);
        assert_eq!(tx.gas_payment, vec![StubClient::gas_object()]);
        // nothing reached the execution path, so nothing was signed
        assert!(client.executed.borrow().is_empty());
    }

    #[test]
    fn direct_dispatch_signs_with_the_held_key_and_submits_once() {
        let client = StubClient::new();
        let signer = AdminSigner::from_hex(SK_HEX);
        let mut batch = TxBatch::new();
        batch.move_call("0xabc::admin::noop", vec![]);
        let outcome = batch
            .dispatch(DispatchStrategy::Direct(&signer), &client)
            .unwrap();
        let DispatchOutcome::Executed(receipt) = outcome else {
            panic!("direct dispatch must execute");
        };
        assert_eq!(receipt.digest, "stub-digest");
        let sent = client.executed.borrow();
        assert_eq!(sent.len(), 1);
        let tx = decode_tx(&sent[0].tx_bytes_b64);
        assert_eq!(tx.sender, signer.address().unwrap());
    }

    #[test]
    fn move_call_handles_index_appended_instructions_in_order() {
        let mut batch = TxBatch::new();
        let first = batch.move_call("0xabc::admin::first", vec![]);
        let second = batch.move_call("0xabc::admin::second", vec![first.clone()]);
        assert_eq!(first, CallArg::CallResult(0));
        assert_eq!(second, CallArg::CallResult(1));
        batch.transfer_objects(vec![second], target_addr());
        assert_eq!(batch.instructions().len(), 3);
        match &batch.instructions()[2] {
            Instruction::TransferObjects { objects, recipient } => {
                assert_eq!(objects, &vec![CallArg::CallResult(1)]);
                assert_eq!(*recipient, target_addr());
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }
}
