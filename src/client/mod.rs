use std::env;
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer as _, SigningKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::error::AdminError;
use crate::tx::TxData;
use crate::types::{Address, ObjectId};

/// Flat per-transaction gas ceiling. Generous for a handful of admin calls;
/// unused budget is refunded by the network.
pub const DEFAULT_GAS_BUDGET: u64 = 50_000_000;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Gas parameters resolved against current network state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GasData {
    pub price: u64,
    pub budget: u64,
    pub payment: Vec<ObjectId>,
}

/// A fully signed transaction, ready for submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignedTx {
    pub tx_bytes_b64: String,
    pub signature_b64: String,
    pub public_key_b64: String,
}

/// Outcome of an on-chain execution. Opaque to this layer: the digest and
/// status are pulled out for logging, the rest is kept as raw JSON.
#[derive(Clone, Debug)]
pub struct ExecutionReceipt {
    pub digest: String,
    pub status: String,
    pub raw: Value,
}

/// The seam between batch construction and the network.
///
/// The admin commands only ever hold one outstanding call at a time; there is
/// no retry or pipelining anywhere behind this trait.
pub trait ChainClient {
    fn reference_gas_price(&self) -> Result<u64, AdminError>;

    fn gas_objects(&self, owner: &Address) -> Result<Vec<ObjectId>, AdminError>;

    /// Non-committing execution check against current on-chain state.
    fn dry_run(&self, tx_bytes_b64: &str) -> Result<Value, AdminError>;

    fn execute(&self, signed: &SignedTx) -> Result<ExecutionReceipt, AdminError>;

    /// Resolve everything serialization needs from the network.
    fn resolve_gas(&self, sender: &Address) -> Result<GasData, AdminError> {
        let price = self.reference_gas_price()?;
        let payment = self.gas_objects(sender)?;
        if payment.is_empty() {
            return Err(AdminError::Build(format!(
                "no gas objects owned by {sender}"
            )));
        }
        Ok(GasData {
            price,
            budget: DEFAULT_GAS_BUDGET,
            payment,
        })
    }
}

/// Blocking JSON-RPC client against a fullnode endpoint.
pub struct RpcClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl RpcClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, AdminError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// One JSON-RPC round trip. RPC-level faults are mapped through `fail`
    /// so that gas resolution surfaces as a Build error and execution as a
    /// Submission error.
    fn rpc(
        &self,
        method: &str,
        params: Value,
        fail: fn(String) -> AdminError,
    ) -> Result<Value, AdminError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let resp: Value = self.http.post(&self.endpoint).json(&body).send()?.json()?;
        if let Some(err) = resp.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown rpc fault");
            return Err(fail(format!("{method}: {message}")));
        }
        resp.get("result")
            .cloned()
            .ok_or_else(|| fail(format!("{method}: response missing result")))
    }
}

impl ChainClient for RpcClient {
    fn reference_gas_price(&self) -> Result<u64, AdminError> {
        let result = self.rpc("chain_getReferenceGasPrice", json!([]), AdminError::Build)?;
        // some nodes return the price as a decimal string
        result
            .as_u64()
            .or_else(|| result.as_str().and_then(|s| s.parse().ok()))
            .ok_or_else(|| AdminError::Build("unparseable reference gas price".into()))
    }

    fn gas_objects(&self, owner: &Address) -> Result<Vec<ObjectId>, AdminError> {
        let result = self.rpc(
            "chain_getOwnedGasObjects",
            json!([owner.to_hex()]),
            AdminError::Build,
        )?;
        let entries = result
            .as_array()
            .ok_or_else(|| AdminError::Build("gas object list is not an array".into()))?;
        let mut ids = Vec::with_capacity(entries.len());
        for entry in entries {
            let s = entry
                .as_str()
                .ok_or_else(|| AdminError::Build("gas object id is not a string".into()))?;
            ids.push(ObjectId::from_hex(s).map_err(|e| AdminError::Build(e.to_string()))?);
        }
        Ok(ids)
    }

    fn dry_run(&self, tx_bytes_b64: &str) -> Result<Value, AdminError> {
        self.rpc(
            "chain_dryRunTransaction",
            json!([tx_bytes_b64]),
            AdminError::Build,
        )
    }

    fn execute(&self, signed: &SignedTx) -> Result<ExecutionReceipt, AdminError> {
        let result = self.rpc(
            "chain_executeTransaction",
            json!([
                &signed.tx_bytes_b64,
                &signed.signature_b64,
                &signed.public_key_b64,
            ]),
            AdminError::Submission,
        )?;
        let digest = result
            .get("digest")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let status = result
            .pointer("/effects/status/status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        if status == "failure" {
            let reason = result
                .pointer("/effects/status/error")
                .and_then(Value::as_str)
                .unwrap_or("execution aborted");
            return Err(AdminError::Submission(format!("{digest}: {reason}")));
        }
        Ok(ExecutionReceipt {
            digest,
            status,
            raw: result,
        })
    }
}

/// Holder of the admin signing key.
///
/// The key is read lazily: an absent `SECRET_KEY` yields an empty string
/// here and is only rejected once a command actually needs to sign.
pub struct AdminSigner {
    secret_hex: String,
}

impl AdminSigner {
    pub const SECRET_ENV: &'static str = "SECRET_KEY";

    pub fn from_env() -> Self {
        Self {
            secret_hex: env::var(Self::SECRET_ENV).unwrap_or_default(),
        }
    }

    pub fn from_hex(secret_hex: impl Into<String>) -> Self {
        Self {
            secret_hex: secret_hex.into(),
        }
    }

    fn signing_key(&self) -> Result<SigningKey, AdminError> {
        let trimmed = self.secret_hex.trim();
        if trimmed.is_empty() {
            return Err(AdminError::Config(format!(
                "{} is not set",
                Self::SECRET_ENV
            )));
        }
        let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .map_err(|e| AdminError::Config(format!("invalid signing key hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AdminError::Config("signing key must be 32 bytes (64 hex chars)".into()))?;
        Ok(SigningKey::from_bytes(&arr))
    }

    /// Address of the held key: sha256 over a scheme flag byte plus the
    /// ed25519 public key.
    pub fn address(&self) -> Result<Address, AdminError> {
        let key = self.signing_key()?;
        Ok(derive_address(key.verifying_key().as_bytes()))
    }

    pub fn sign(&self, tx: &TxData) -> Result<SignedTx, AdminError> {
        let key = self.signing_key()?;
        let bytes = tx.to_bytes()?;
        let signature = key.sign(&signing_digest(&bytes));
        Ok(SignedTx {
            tx_bytes_b64: general_purpose::STANDARD.encode(&bytes),
            signature_b64: general_purpose::STANDARD.encode(signature.to_bytes()),
            public_key_b64: general_purpose::STANDARD.encode(key.verifying_key().as_bytes()),
        })
    }
}

pub fn derive_address(public_key: &[u8; 32]) -> Address {
    let mut hasher = Sha256::new();
    hasher.update([0x00]); // ed25519 scheme flag
    hasher.update(public_key);
    Address::new(hasher.finalize().into())
}

/// Domain-separated digest actually covered by the signature.
pub fn signing_digest(tx_bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"referral-admin-tx-v1");
    hasher.update(tx_bytes);
    hasher.finalize().into()
}
