use serde::{Deserialize, Serialize};

/// SSH key pair registered with OpenStack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    pub name: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(rename = "publicKey", alias = "public_key", default)]
    pub public_key: String,
}

/// Nova wraps every keypair in its own object.
#[derive(Debug, Deserialize)]
pub struct KeypairEntry {
    pub keypair: Keypair,
}

/// `GET /os-keypairs` response body.
#[derive(Debug, Deserialize)]
pub struct KeypairList {
    #[serde(default)]
    pub keypairs: Vec<KeypairEntry>,
}

impl KeypairList {
    pub fn into_keypairs(self) -> Vec<Keypair> {
        self.keypairs.into_iter().map(|entry| entry.keypair).collect()
    }
}
