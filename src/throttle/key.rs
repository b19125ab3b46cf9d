//! Composite key derivation.

/// Identifies one counted entity: a client address paired with the route
/// it is hitting. Exhausting the budget for one key never affects another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientKey {
    /// The client identifier, typically a network address
    pub client: String,
    /// The endpoint identifier, typically a route path
    pub endpoint: String,
}

impl ClientKey {
    /// Create a key from a client and endpoint identifier.
    pub fn new(client: &str, endpoint: &str) -> Self {
        Self {
            client: client.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Canonical string form, used as the store key and in logs.
    pub fn to_store_key(&self) -> String {
        format!("{}:{}", self.client, self.endpoint)
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_store_key())
    }
}
