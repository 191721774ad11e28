// ABOUTME: Per-request deployment token appended to every container name.
// ABOUTME: Hex only, so it never contains the '-' used as a name separator.

use std::fmt;
use uuid::Uuid;

const LEN: usize = 12;

/// Fresh for every deploy or update call and shared by all of its services.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeploymentId(String);

impl DeploymentId {
    pub fn generate() -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        Self(simple[..LEN].to_string())
    }

    /// Accepts an existing token, e.g. one split off a container name.
    pub fn parse(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value.len() <= 32
            && value.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeploymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
