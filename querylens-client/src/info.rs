use querylens_protocol::list::FilterKind;
use serde::Deserialize;

use crate::client::{ApiClient, QueryPairs};
use crate::error::ClientError;

/// Older backends list bare names, newer ones describe each entry.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InfoValue {
    Name(String),
    Described { name: String },
}

impl InfoValue {
    fn into_name(self) -> String {
        match self {
            InfoValue::Name(name) | InfoValue::Described { name } => name,
        }
    }
}

pub(crate) fn info_path(kind: FilterKind) -> &'static str {
    match kind {
        FilterKind::Databases => "info/databases",
        FilterKind::ResourceGroups => "info/resource_groups",
        FilterKind::StatementKinds => "statements/stmt_types",
    }
}

/// Candidate values for a filter dropdown, with blanks dropped.
pub(crate) async fn list_info_values(
    client: &ApiClient,
    kind: FilterKind,
) -> Result<Vec<String>, ClientError> {
    let values: Vec<InfoValue> = client.get_json(info_path(kind), &QueryPairs::new()).await?;
    Ok(values
        .into_iter()
        .map(InfoValue::into_name)
        .filter(|name| !name.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_names_and_described_entries() {
        let values: Vec<InfoValue> =
            serde_json::from_str(r#"["default", {"name": "rg_batch", "ru_per_sec": 2000}]"#).unwrap();
        let names: Vec<String> = values.into_iter().map(InfoValue::into_name).collect();
        assert_eq!(names, vec!["default", "rg_batch"]);
    }
}
