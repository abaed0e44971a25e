//! Consul health endpoint response model (`/v1/health/service/:service`)

use crate::discovery::RawDiscoveryRecord;
use serde::{Deserialize, Serialize};

/// One row of the health endpoint: a service instance, its node and its checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthEntry {
    pub node: HealthNode,
    pub service: HealthService,
    pub checks: Vec<HealthCheck>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthNode {
    pub node: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    pub tags: Option<Vec<String>>,
    pub address: String,
    pub port: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthCheck {
    pub node: String,
    #[serde(rename = "CheckID")]
    pub check_id: String,
    pub name: String,
    pub status: String,
    #[serde(rename = "ServiceID")]
    pub service_id: String,
}

impl HealthEntry {
    /// Instance address. Consul leaves `Service.Address` empty when the
    /// service runs on the node address.
    pub fn address(&self) -> &str {
        if self.service.address.is_empty() {
            &self.node.address
        } else {
            &self.service.address
        }
    }

    pub fn is_passing(&self) -> bool {
        self.checks.iter().all(|c| c.status == "passing")
    }

    pub fn to_record(&self) -> RawDiscoveryRecord {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        RawDiscoveryRecord::new(self.address(), self.service.port)
            .with_identity(non_empty(&self.service.id), non_empty(&self.node.node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"[
      {
        "Node": {"ID": "40e4a748", "Node": "es-node-1", "Address": "10.1.10.12", "Datacenter": "dc1"},
        "Service": {"ID": "elasticsearch-1", "Service": "elasticsearch", "Tags": ["prod"], "Address": "10.1.10.20", "Port": 9300},
        "Checks": [
          {"Node": "es-node-1", "CheckID": "serfHealth", "Name": "Serf Health Status", "Status": "passing", "ServiceID": ""},
          {"Node": "es-node-1", "CheckID": "service:elasticsearch-1", "Name": "transport", "Status": "passing", "ServiceID": "elasticsearch-1"}
        ]
      },
      {
        "Node": {"Node": "es-node-2", "Address": "10.1.10.13"},
        "Service": {"ID": "elasticsearch-2", "Service": "elasticsearch", "Tags": null, "Address": "", "Port": 9300},
        "Checks": [
          {"Node": "es-node-2", "CheckID": "service:elasticsearch-2", "Status": "critical"}
        ]
      }
    ]"#;

    #[test]
    fn test_parse_health_response() {
        let entries: Vec<HealthEntry> = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].service.id, "elasticsearch-1");
        assert_eq!(entries[0].service.tags.as_deref(), Some(&["prod".to_string()][..]));
        assert_eq!(entries[0].checks[1].check_id, "service:elasticsearch-1");
        assert!(entries[1].service.tags.is_none());
    }

    #[test]
    fn test_service_address_preferred() {
        let entries: Vec<HealthEntry> = serde_json::from_str(RESPONSE).unwrap();
        let record = entries[0].to_record();
        assert_eq!(record.ip, "10.1.10.20");
        assert_eq!(record.port, 9300);
        assert_eq!(record.service.as_deref(), Some("elasticsearch-1"));
        assert_eq!(record.node.as_deref(), Some("es-node-1"));
    }

    #[test]
    fn test_empty_service_address_falls_back_to_node() {
        let entries: Vec<HealthEntry> = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(entries[1].to_record().ip, "10.1.10.13");
    }

    #[test]
    fn test_is_passing() {
        let entries: Vec<HealthEntry> = serde_json::from_str(RESPONSE).unwrap();
        assert!(entries[0].is_passing());
        assert!(!entries[1].is_passing());
    }

    #[test]
    fn test_missing_fields_default() {
        let entry: HealthEntry = serde_json::from_str(r#"{"Service": {"Port": 1}}"#).unwrap();
        let record = entry.to_record();
        assert_eq!(record.ip, "");
        assert_eq!(record.port, 1);
        assert!(record.service.is_none());
        assert!(record.node.is_none());
    }
}
