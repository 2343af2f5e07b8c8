use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 建立/更新時間戳
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timestamps {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
        }
    }

    /// 每次儲存時更新 updated_at
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Timestamps {
    fn default() -> Self {
        Self::now()
    }
}

/// Free-form JSON metadata attached to a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(Map<String, Value>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_value_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.0.get(key).unwrap_or(default)
    }

    pub fn store_values<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.0.extend(items);
    }

    /// 將值附加到 key 對應的列表；不存在時建立列表，純量則轉成列表
    pub fn append_value(&mut self, key: &str, value: Value) {
        match self.0.get_mut(key) {
            None => {
                self.0.insert(key.to_string(), Value::Array(vec![value]));
            }
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn delete_value(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// 要抓取的圖片 URL
    pub image: Option<String>,
    /// 閱讀全文的連結
    pub article_url: String,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Article {
    pub fn new(title: &str, article_url: &str) -> Self {
        Self {
            title: title.to_string(),
            image: None,
            article_url: article_url.to_string(),
            timestamps: Timestamps::now(),
            metadata: Metadata::new(),
        }
    }
}

impl std::fmt::Display for Article {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// 文章來源 (feed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub feed_url: String,
    /// 上次抓取文章的時間
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Source {
    pub fn new(name: &str, feed_url: &str) -> Self {
        Self {
            name: name.to_string(),
            feed_url: feed_url.to_string(),
            fetched_at: None,
            timestamps: Timestamps::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn mark_fetched(&mut self) {
        let now = Utc::now();
        self.fetched_at = Some(now);
        self.timestamps.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_value_creates_and_extends_list() {
        let mut metadata = Metadata::new();
        metadata.append_value("tags", json!("rust"));
        metadata.append_value("tags", json!("web"));
        assert_eq!(metadata.get_value("tags"), Some(&json!(["rust", "web"])));
    }

    #[test]
    fn test_append_value_promotes_scalar() {
        let mut metadata = Metadata::new();
        metadata.store_values([("lang".to_string(), json!("en"))]);
        metadata.append_value("lang", json!("fr"));
        assert_eq!(metadata.get_value("lang"), Some(&json!(["en", "fr"])));
    }

    #[test]
    fn test_delete_and_clear() {
        let mut metadata = Metadata::new();
        metadata.store_values([
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
        ]);
        assert_eq!(metadata.delete_value("a"), Some(json!(1)));
        assert_eq!(metadata.delete_value("a"), None);
        assert_eq!(metadata.get_value_or("a", &Value::Null), &Value::Null);
        metadata.clear();
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_source_serializes_flat_timestamps() {
        let mut source = Source::new("Example Feed", "https://example.com/feed.xml");
        source.mark_fetched();
        let value = serde_json::to_value(&source).unwrap();
        assert!(value.get("created_at").is_some());
        assert!(value.get("fetched_at").is_some());

        let back: Source = serde_json::from_value(value).unwrap();
        assert_eq!(back, source);
    }
}
