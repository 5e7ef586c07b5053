//! Content hashing for cache equality checks.
//!
//! A deterministic, non-cryptographic 64-bit FNV-1a hash over the fields
//! that define a capability's observable content: name, confidence,
//! description, and input schema. Collisions are possible in principle;
//! the hash only decides whether a cached entry needs rewriting.

use crate::domain::models::Capability;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const FIELD_SEPARATOR: u8 = 0x1f;
const RECORD_SEPARATOR: u8 = 0x1e;

#[derive(Debug, Clone, Copy)]
struct Fnv1a(u64);

impl Fnv1a {
    const fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn write_tool(&mut self, tool: &Capability) {
        // serde_json maps are ordered, so schema serialization is stable.
        let schema = serde_json::to_string(&tool.input_schema).unwrap_or_default();
        let confidence = tool.confidence.to_string();
        for field in [
            tool.name.as_str(),
            confidence.as_str(),
            tool.description.as_str(),
            schema.as_str(),
        ] {
            self.write(field.as_bytes());
            self.write(&[FIELD_SEPARATOR]);
        }
        self.write(&[RECORD_SEPARATOR]);
    }

    fn hex(self) -> String {
        format!("{:016x}", self.0)
    }
}

/// Hash of a single capability.
pub fn tool_hash(tool: &Capability) -> String {
    let mut hasher = Fnv1a::new();
    hasher.write_tool(tool);
    hasher.hex()
}

/// Order-independent hash of a capability list.
pub fn tools_hash(tools: &[Capability]) -> String {
    let mut sorted: Vec<&Capability> = tools.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut hasher = Fnv1a::new();
    for tool in sorted {
        hasher.write_tool(tool);
    }
    hasher.hex()
}
