use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

/// `GET /os-networks` response body.
#[derive(Debug, Deserialize)]
pub struct NetworkList {
    #[serde(default)]
    pub networks: Vec<Network>,
}
