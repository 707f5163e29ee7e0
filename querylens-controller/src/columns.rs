use std::collections::{BTreeMap, BTreeSet};

use querylens_protocol::records::Record;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage::{LocalStorage, VersionedStore};

/// Column id to visibility flag.
pub type ColumnVisibility = BTreeMap<String, bool>;

/// Bumped whenever the persisted column mapping changes shape.
pub const VISIBLE_COLUMNS_VERSION: u32 = 1;
pub const SHOW_FULL_SQL_VERSION: u32 = 1;

/// Remembers which table columns the user wants visible for one view.
#[derive(Debug, Clone)]
pub struct ColumnVisibilityStore {
    store: VersionedStore<ColumnVisibility>,
    defaults: ColumnVisibility,
}

impl ColumnVisibilityStore {
    /// `default_columns` are visible out of the box; anything else is hidden
    /// until the user turns it on.
    pub fn new<I, S>(storage: LocalStorage, view_key: &str, default_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = default_columns
            .into_iter()
            .map(|column| (column.into(), true))
            .collect();
        Self {
            store: VersionedStore::new(
                storage,
                format!("{view_key}.visible_columns"),
                VISIBLE_COLUMNS_VERSION,
            ),
            defaults,
        }
    }

    pub fn defaults(&self) -> &ColumnVisibility {
        &self.defaults
    }

    /// Defaults overlaid with whatever the user stored.
    pub fn get(&self) -> ColumnVisibility {
        let mut visibility = self.defaults.clone();
        if let Some(stored) = self.store.load() {
            visibility.extend(stored);
        }
        visibility
    }

    pub fn set(&self, next: &ColumnVisibility) -> Result<(), StorageError> {
        self.store.save(next)
    }

    /// Updates one column and returns the resulting mapping.
    pub fn toggle(&self, column: &str, visible: bool) -> Result<ColumnVisibility, StorageError> {
        let mut visibility = self.get();
        visibility.insert(column.to_string(), visible);
        self.set(&visibility)?;
        Ok(visibility)
    }

    pub fn reset_to_default(&self) -> Result<ColumnVisibility, StorageError> {
        self.store.remove()?;
        Ok(self.defaults.clone())
    }

    pub fn visible_columns(&self) -> Vec<String> {
        visible_columns(&self.get())
    }
}

/// Ids of the columns flagged visible, in id order.
pub fn visible_columns(visibility: &ColumnVisibility) -> Vec<String> {
    visibility
        .iter()
        .filter(|(_, visible)| **visible)
        .map(|(column, _)| column.clone())
        .collect()
}

/// Per-view boolean preferences such as "show full SQL text".
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    store: VersionedStore<bool>,
    default: bool,
}

impl PreferenceStore {
    pub fn show_full_sql(storage: LocalStorage, view_key: &str) -> Self {
        Self {
            store: VersionedStore::new(
                storage,
                format!("{view_key}.show_full_sql"),
                SHOW_FULL_SQL_VERSION,
            ),
            default: false,
        }
    }

    pub fn get(&self) -> bool {
        self.store.load().unwrap_or(self.default)
    }

    pub fn set(&self, value: bool) -> Result<(), StorageError> {
        self.store.save(&value)
    }
}

/// A column a view can render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub id: String,
    /// Listed by the backend's available-fields endpoint.
    pub advertised: bool,
    /// Carried by at least one fetched row.
    pub in_rows: bool,
}

/// Union of the fields present in `rows` and the server allowlist.
///
/// Advertised fields come first in the server's order, followed by row-only
/// fields sorted by id. Without an allowlist every row field is listed.
pub fn available_columns<R: Record>(
    rows: &[R],
    advertised: Option<&[String]>,
) -> Vec<ColumnDescriptor> {
    let row_fields: BTreeSet<String> = rows.iter().flat_map(R::field_names).collect();
    let mut columns = Vec::new();
    let mut seen = BTreeSet::new();

    for id in advertised.unwrap_or_default() {
        if seen.insert(id.clone()) {
            columns.push(ColumnDescriptor {
                id: id.clone(),
                advertised: true,
                in_rows: row_fields.contains(id),
            });
        }
    }

    for id in row_fields {
        if seen.insert(id.clone()) {
            columns.push(ColumnDescriptor {
                id,
                advertised: false,
                in_rows: true,
            });
        }
    }

    columns
}
