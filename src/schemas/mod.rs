pub(crate) mod attempt;
pub(crate) mod exam;
pub(crate) mod user;

use serde::{Deserialize, Deserializer};

/// The server populates reference fields either as a bare id string or as an
/// embedded document (`{"_id": "...", ...}`) depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntityRef {
    Id(String),
    Embedded(EmbeddedRef),
}

#[derive(Debug, Deserialize)]
struct EmbeddedRef {
    #[serde(rename = "_id", alias = "id")]
    id: String,
}

impl EntityRef {
    fn into_id(self) -> String {
        match self {
            EntityRef::Id(id) => id,
            EntityRef::Embedded(embedded) => embedded.id,
        }
    }
}

pub(crate) fn entity_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    EntityRef::deserialize(deserializer).map(EntityRef::into_id)
}

pub(crate) fn optional_entity_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<EntityRef>::deserialize(deserializer)?;
    Ok(value.map(EntityRef::into_id))
}
