use crate::domain::model::AppRegistryEntry;
use crate::domain::ports::AppRegistry;
use crate::utils::error::{RealzError, Result};
use std::collections::BTreeMap;

/// 已安裝的 app 列表，以 label 為鍵
#[derive(Debug, Clone, Default)]
pub struct InstalledApps {
    entries: BTreeMap<String, AppRegistryEntry>,
}

impl InstalledApps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = AppRegistryEntry>,
    {
        let mut apps = Self::new();
        for entry in entries {
            apps.install(entry)?;
        }
        Ok(apps)
    }

    /// 安裝 app；label 重複時回報設定錯誤
    pub fn install(&mut self, entry: AppRegistryEntry) -> Result<()> {
        if let Some(existing) = self.entries.get(&entry.label) {
            return Err(RealzError::ImproperlyConfigured {
                message: format!(
                    "Application labels aren't unique, duplicates: {} ({} and {})",
                    entry.label, existing.name, entry.name
                ),
            });
        }
        tracing::debug!("Installed app '{}' from '{}'", entry.label, entry.name);
        self.entries.insert(entry.label.clone(), entry);
        Ok(())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AppRegistry for InstalledApps {
    fn get_app_config(&self, label: &str) -> Option<AppRegistryEntry> {
        self.entries.get(label).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(label: &str, name: &str) -> AppRegistryEntry {
        AppRegistryEntry {
            label: label.to_string(),
            name: name.to_string(),
            core: true,
        }
    }

    #[test]
    fn test_lookup_by_label() {
        let apps = InstalledApps::from_entries([
            entry("users", "myproject.users"),
            entry("articles", "realzhub.apps.articles"),
        ])
        .unwrap();

        assert_eq!(apps.len(), 2);
        assert_eq!(
            apps.get_app_config("users").map(|e| e.name),
            Some("myproject.users".to_string())
        );
        assert!(apps.get_app_config("dashboard").is_none());
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let result = InstalledApps::from_entries([
            entry("users", "realzhub.apps.users"),
            entry("users", "myproject.users"),
        ]);
        assert!(matches!(
            result,
            Err(RealzError::ImproperlyConfigured { .. })
        ));
    }
}
