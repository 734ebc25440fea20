use serde::{Deserialize, Serialize};

/// OpenStack compute sizing template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    pub vcpus: u32,
    /// Memory in MB
    pub ram: u64,
    /// Root disk in GB
    pub disk: u64,
}

impl Flavor {
    /// RAM shown in GB above 1024 MB, otherwise in MB.
    pub fn ram_display(&self) -> String {
        if self.ram > 1024 {
            format!("{}GB", self.ram as f64 / 1024.0)
        } else {
            format!("{}MB", self.ram)
        }
    }

    /// Short sizing line used next to the flavor name in selectors.
    pub fn summary(&self) -> String {
        format!("{}vCPU {} {}GB", self.vcpus, self.ram_display(), self.disk)
    }
}

/// `GET /flavors/detail` response body.
#[derive(Debug, Deserialize)]
pub struct FlavorList {
    #[serde(default)]
    pub flavors: Vec<Flavor>,
}
