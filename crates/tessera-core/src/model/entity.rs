use crate::model::relation::RelationModel;

///
/// EntityModel
/// Immutable metadata for one entity type.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Fully-qualified type path (identity of the entity type).
    pub path: &'static str,
    /// Table / collection name in the backend.
    pub entity_name: &'static str,
    /// Primary key field name.
    pub primary_key: &'static str,
    /// Relationship descriptors, in declaration order.
    pub relations: &'static [RelationModel],
    /// Whether instances may live in the session identity cache.
    pub cacheable: bool,
}

impl EntityModel {
    #[must_use]
    pub const fn new(
        path: &'static str,
        entity_name: &'static str,
        primary_key: &'static str,
        relations: &'static [RelationModel],
        cacheable: bool,
    ) -> Self {
        Self {
            path,
            entity_name,
            primary_key,
            relations,
            cacheable,
        }
    }

    /// Look up a relationship descriptor by field name.
    #[must_use]
    pub fn relation(&self, field: &str) -> Option<&'static RelationModel> {
        self.relations.iter().find(|relation| relation.field == field)
    }
}
