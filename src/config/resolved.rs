//! Resolved model: declarations validated and turned into runtime schemas and policies.

use crate::policy::PolicySet;
use crate::schema::EntitySchema;

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub schemas: Vec<EntitySchema>,
    pub policies: PolicySet,
}

impl ResolvedModel {
    pub fn schema(&self, name: &str) -> Option<&EntitySchema> {
        self.schemas.iter().find(|s| s.name == name)
    }
}
