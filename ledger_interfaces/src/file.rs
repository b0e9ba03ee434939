//! Declarative description of a contract's interface (§3, `InterfaceFile`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryKind {
    Function,
    Procedure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub kind: EntryKind,
    pub name: String,
    pub input_type: u16,
    #[serde(default)]
    pub input_size: Option<u32>,
    #[serde(default)]
    pub output_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub name: String,
    #[serde(default)]
    pub contract_index: Option<u32>,
    #[serde(default)]
    pub contract_public_key_hex: Option<String>,
    #[serde(default)]
    pub contract_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceFile {
    pub contract: ContractDescriptor,
    pub entries: Vec<InterfaceEntry>,
}

impl InterfaceFile {
    /// A function query requires a `contractIndex` (§3 invariant).
    pub fn has_query_target(&self) -> bool {
        self.contract.contract_index.is_some()
    }

    /// A procedure transaction requires at least one of `{contractId, contractPublicKeyHex}`.
    pub fn has_procedure_target(&self) -> bool {
        self.contract.contract_id.is_some() || self.contract.contract_public_key_hex.is_some()
    }

    pub fn find_entry(&self, kind: EntryKind, name: &str) -> Option<&InterfaceEntry> {
        self.entries
            .iter()
            .find(|entry| entry.kind == kind && entry.name == name)
    }
}
