// SPDX-License-Identifier: AGPL-3.0-or-later

use serde::Deserialize;

/// How the primary key of a freshly inserted row is read back from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertIdRetrieval {
    /// Append `SELECT @cinchyid` to the insert statement.
    SelectGeneratedId,

    /// Capture the generated id with `OUTPUT INSERTED.[Cinchy ID] INTO` a temporary table and
    /// select it from there.
    OutputInto,
}

impl InsertIdRetrieval {
    /// Resolves the capability from a raw backend version string.
    ///
    /// Backends of the 4.x line expose the generated id through a session variable, every other
    /// version needs the temporary table pattern.
    pub fn from_backend_version(version: &str) -> Self {
        if version.trim().starts_with("4.") {
            Self::SelectGeneratedId
        } else {
            Self::OutputInto
        }
    }
}

impl Default for InsertIdRetrieval {
    fn default() -> Self {
        Self::OutputInto
    }
}

/// Configuration object holding all important variables throughout the form engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Mechanism used to read back primary keys of inserted rows.
    ///
    /// When not set explicitly it gets derived once from `backend_version`, see
    /// [`Configuration::insert_id_retrieval`].
    pub insert_id_retrieval: Option<InsertIdRetrieval>,

    /// Raw version string reported by the backend, for example "4.19.2".
    pub backend_version: Option<String>,

    /// Reload the whole form after a successful save so derived and display values reflect the
    /// state the backend resolved. Defaults to true.
    pub reload_after_save: bool,

    /// Fetch `{id, label}` option datasets for link columns during assembly. Defaults to true.
    pub load_link_options: bool,
}

impl Configuration {
    /// Returns the insert id capability, preferring the explicit setting over the one derived
    /// from the backend version.
    pub fn insert_id_retrieval(&self) -> InsertIdRetrieval {
        match (&self.insert_id_retrieval, &self.backend_version) {
            (Some(retrieval), _) => *retrieval,
            (None, Some(version)) => InsertIdRetrieval::from_backend_version(version),
            (None, None) => InsertIdRetrieval::default(),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            insert_id_retrieval: None,
            backend_version: None,
            reload_after_save: true,
            load_link_options: true,
        }
    }
}
