use serde::Deserialize;

fn default_timeout_secs() -> u64 {
    10
}

/// Selects the backend that answers identity and session lookups.
#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
#[serde(tag = "type")]
pub enum SessionStoreType {
    Archive {
        base_url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}
