use serde::{Deserialize, Serialize};

/// Maps one logical field of one host class to the symbol it has in a
/// particular host build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub owner: String,
    pub name: String,
    pub symbol: String,
}

/// Field symbols of every supported internal for one host version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostLayout {
    pub version: String,
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
}

impl HostLayout {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            fields: Vec::new(),
        }
    }

    pub fn map(mut self, owner: &str, name: &str, symbol: &str) -> Self {
        self.fields.retain(|f| !(f.owner == owner && f.name == name));
        self.fields.push(FieldMapping {
            owner: owner.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
        });
        self
    }

    pub fn symbol(&self, owner: &str, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.owner == owner && f.name == name)
            .map(|f| f.symbol.as_str())
    }

    pub fn v1_4_5() -> Self {
        use crate::reflect::classes::{class, field};

        Self::new("v1_4_5")
            .map(class::WORLD_SERVER, field::PLAYER_MANAGER, "manager")
            .map(class::WORLD, field::ACCESS_LIST, "w")
            .map(class::WORLD_SERVER, field::ENTITIES_BY_ID, "entitiesById")
            .map(class::CHUNK_PROVIDER, field::CHUNKS, "chunks")
            .map(class::CHUNK_PROVIDER, field::UNLOAD_QUEUE, "unloadQueue")
            .map(class::CHUNK, field::SECTIONS, "sections")
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::v1_4_5()]
    }
}
