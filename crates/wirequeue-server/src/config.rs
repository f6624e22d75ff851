//! Construction parameters for [`crate::Server`]: `Default` plus
//! chained `with_*` methods rather than a struct-literal-only config.

/// `capacity = 0` means unbounded; `max_clients = 0` means no admission
/// limit. `auth_key`, left unset, skips authentication entirely.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub name: Option<String>,
    pub capacity: usize,
    pub max_clients: usize,
    pub auth_key: Option<String>,
}

impl ServerConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_clients(mut self, max_clients: usize) -> Self {
        self.max_clients = max_clients;
        self
    }

    pub fn with_auth_key(mut self, auth_key: impl Into<String>) -> Self {
        self.auth_key = Some(auth_key.into());
        self
    }
}
