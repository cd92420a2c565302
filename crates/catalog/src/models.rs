use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Assigned by the database on insert; absent in create requests.
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Free-form date string, stored and returned as-is.
    pub released_date: String,
}
