use crate::config::toml_config::{AccessEntry, EtlConfig, WarehouseEntry};
use crate::domain::model::{AccessList, Warehouse};
use crate::domain::ports::WarehouseDirectory;
use crate::utils::error::Result;

/// 倉庫憑證與存取名單，來源為設定檔的 `[[warehouses]]` / `[[access]]`
#[derive(Debug, Clone, Default)]
pub struct ConfigDirectory {
    warehouses: Vec<WarehouseEntry>,
    access: Vec<AccessEntry>,
}

impl ConfigDirectory {
    pub fn new(warehouses: Vec<WarehouseEntry>, access: Vec<AccessEntry>) -> Self {
        Self { warehouses, access }
    }

    pub fn from_config(config: &EtlConfig) -> Self {
        Self::new(config.warehouses.clone(), config.access.clone())
    }
}

fn complete(entry: &WarehouseEntry) -> Option<Warehouse> {
    let field = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Some(Warehouse {
        warehouse_name: field(&entry.warehouse_name)?,
        city: field(&entry.city).unwrap_or_default(),
        client_id: field(&entry.client_id)?,
        api_key: field(&entry.api_key)?,
    })
}

impl WarehouseDirectory for ConfigDirectory {
    fn warehouses(&self) -> Result<Vec<Warehouse>> {
        let mut warehouses = Vec::with_capacity(self.warehouses.len());
        for (index, entry) in self.warehouses.iter().enumerate() {
            match complete(entry) {
                Some(warehouse) => warehouses.push(warehouse),
                None => tracing::debug!("Skipping incomplete warehouse entry #{}: {:?}", index, entry),
            }
        }
        Ok(warehouses)
    }

    fn access_list(&self) -> Result<AccessList> {
        let mut access = AccessList::default();
        for entry in &self.access {
            access.grant(entry.warehouse_name.trim(), &entry.chat_id);
        }
        tracing::debug!(
            "Loaded {} access entries across {} warehouses",
            access.total_entries(),
            access.warehouse_count()
        );
        Ok(access)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, client_id: &str, api_key: &str) -> WarehouseEntry {
        WarehouseEntry {
            warehouse_name: Some(name.to_string()),
            city: None,
            client_id: Some(client_id.to_string()),
            api_key: Some(api_key.to_string()),
        }
    }

    fn access(warehouse: &str, chat_id: &str) -> AccessEntry {
        AccessEntry {
            warehouse_name: warehouse.to_string(),
            chat_id: chat_id.to_string(),
        }
    }

    #[test]
    fn test_incomplete_warehouses_are_skipped() {
        let directory = ConfigDirectory::new(
            vec![
                entry("Main", "1", "k1"),
                entry("NoKey", "2", " "),
                WarehouseEntry {
                    client_id: Some("3".to_string()),
                    api_key: Some("k3".to_string()),
                    ..Default::default()
                },
                entry("North", "4", "k4"),
            ],
            vec![],
        );

        let names: Vec<String> = directory
            .warehouses()
            .unwrap()
            .into_iter()
            .map(|w| w.warehouse_name)
            .collect();
        assert_eq!(names, vec!["Main", "North"]);
    }

    #[test]
    fn test_find_warehouse() {
        let directory = ConfigDirectory::new(vec![entry("Main", "1", "k1")], vec![]);

        let found = directory.find_warehouse("Main").unwrap().unwrap();
        assert_eq!(found.client_id, "1");
        assert!(directory.find_warehouse("Missing").unwrap().is_none());
    }

    #[test]
    fn test_access_list_collapses_duplicates() {
        let directory = ConfigDirectory::new(
            vec![],
            vec![access("Main", "100"), access("Main", "100"), access("North", "100"), access("Main", "")],
        );

        let list = directory.access_list().unwrap();
        assert_eq!(list.total_entries(), 2);
        assert!(list.is_allowed("100", "Main"));
        assert!(list.is_allowed("100", "North"));
        assert!(!list.is_allowed("200", "Main"));
    }
}
