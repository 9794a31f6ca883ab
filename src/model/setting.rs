use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::server::InvalidConfigChange;

/// Category of a dynamic setting, the first segment of its dotted name.
///
/// Each category maps to exactly one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingCategory {
    DataDirs,
    OffheapResources,
}

impl SettingCategory {
    pub const ALL: [SettingCategory; 2] = [SettingCategory::DataDirs, SettingCategory::OffheapResources];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingCategory::DataDirs => "data-dirs",
            SettingCategory::OffheapResources => "offheap-resources",
        }
    }
}

impl fmt::Display for SettingCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingCategory {
    type Err = InvalidConfigChange;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SettingCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| InvalidConfigChange::new(format!("Unknown setting: {}", s)))
    }
}

/// Parsed form of a dotted setting name such as `offheap-resources.main`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingName {
    pub category: SettingCategory,
    pub key: String,
}

impl SettingName {
    pub fn parse(name: &str) -> std::result::Result<Self, InvalidConfigChange> {
        let (category, key) = name
            .split_once('.')
            .ok_or_else(|| InvalidConfigChange::new(format!("Setting '{}' must be of the form <category>.<name>", name)))?;

        let category: SettingCategory = category.parse()?;
        if key.is_empty() || key.contains('.') {
            return Err(InvalidConfigChange::new(format!(
                "Invalid {} name in setting '{}'",
                category, name
            )));
        }

        Ok(Self {
            category,
            key: key.to_string(),
        })
    }
}

impl fmt::Display for SettingName {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}.{}", self.category, self.key)
    }
}
