use serde::Deserialize;
use session_store::config::SessionStoreType;

#[derive(Clone, Deserialize, Debug)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,

    /// Path under which the service is mounted, e.g. "/xnat-app". Routes are
    /// nested below it and it appears in generated URLs after any forwarded
    /// prefix. Empty means the service is mounted at the root.
    #[serde(default)]
    pub context_path: String,

    pub session_store: SessionStoreType,
}
