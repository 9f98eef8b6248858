use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AdminError;
use crate::types::ObjectId;

/// Deployment manifest written by the publish tooling.
pub const DEFAULT_MANIFEST: &str = "publish-result.production.json";

/// Which generation of the admin capability the calls should reference.
///
/// V1 is the original single-key capability; V2 is the capability minted by
/// `upgrade_admin_cap` and held by the multisig account. The two sets target
/// differently-suffixed entry functions, so a run must pick the generation
/// matching the contract version currently accepting calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapSet {
    V1,
    V2,
}

/// Identifiers of the deployed package and the shared objects admin calls
/// reference. Loaded once per run, never mutated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractRef {
    pub package_id: ObjectId,
    pub admin_cap: ObjectId,
    pub admin_cap_v2: ObjectId,
    pub referral_tiers: ObjectId,
    pub version_object: ObjectId,
    pub upgrade_cap: ObjectId,
}

impl ContractRef {
    pub fn load(path: &Path) -> Result<Self, AdminError> {
        let bytes = fs::read(path).map_err(|e| {
            AdminError::Config(format!("cannot read manifest {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// The capability object authorizing admin calls for `caps`.
    pub fn capability(&self, caps: CapSet) -> ObjectId {
        match caps {
            CapSet::V1 => self.admin_cap,
            CapSet::V2 => self.admin_cap_v2,
        }
    }

    /// Fully-qualified target of an `admin` module entry function, with the
    /// `_v2` suffix applied for the upgraded capability set.
    pub fn admin_target(&self, caps: CapSet, name: &str) -> String {
        match caps {
            CapSet::V1 => format!("{}::admin::{name}", self.package_id),
            CapSet::V2 => format!("{}::admin::{name}_v2", self.package_id),
        }
    }
}
