use crate::utils::error::{RealzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 模組標籤，例如 `users.forms`；第一段是 app label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleLabel(String);

impl ModuleLabel {
    pub fn parse(label: &str) -> Result<Self> {
        if !label.contains('.') {
            return Err(RealzError::InvalidModuleLabel {
                label: label.to_string(),
            });
        }
        Ok(Self(label.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 標籤的第一段 (app label)
    pub fn app_label(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// 第一段之後的所有片段
    pub fn submodule_segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').skip(1)
    }
}

impl fmt::Display for ModuleLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleLabel {
    type Err = RealzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// App registry 中的一筆登記
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRegistryEntry {
    pub label: String,
    /// 實際提供此 app 的套件名稱，例如 `realzhub.apps.users` 或 `myproject.users`
    pub name: String,
    /// 是否為 realzhub 的 AppConfig (只有這類 app 可作為類別解析來源)
    #[serde(default = "default_core")]
    pub core: bool,
}

fn default_core() -> bool {
    true
}

/// Permission spec: a single AND-group, or an OR across AND-groups.
///
/// In TOML/JSON a flat list of strings is one group, a list of lists is a
/// disjunction:
///
/// ```toml
/// detail = ["is_staff"]
/// update = [["is_staff"], ["users.change_user"]]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionSpec {
    All(Vec<String>),
    Any(Vec<Vec<String>>),
}

impl PermissionSpec {
    pub fn all<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionSpec::All(tokens.into_iter().map(Into::into).collect())
    }

    pub fn any<G, I, S>(groups: G) -> Self
    where
        G: IntoIterator<Item = I>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionSpec::Any(
            groups
                .into_iter()
                .map(|group| group.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PermissionSpec::All(tokens) => tokens.is_empty(),
            PermissionSpec::Any(groups) => groups.is_empty(),
        }
    }

    /// 以 AND-group 列表的形式檢視
    pub fn groups(&self) -> Vec<&[String]> {
        match self {
            PermissionSpec::All(tokens) => vec![tokens.as_slice()],
            PermissionSpec::Any(groups) => groups.iter().map(Vec::as_slice).collect(),
        }
    }
}

impl fmt::Display for PermissionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionSpec::All(tokens) => write!(f, "{}", tokens.join(" AND ")),
            PermissionSpec::Any(groups) => {
                let rendered: Vec<String> = groups
                    .iter()
                    .map(|group| format!("({})", group.join(" AND ")))
                    .collect();
                write!(f, "{}", rendered.join(" OR "))
            }
        }
    }
}
