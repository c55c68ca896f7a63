use sea_orm::entity::prelude::*;

/// A reusable node blueprint. Workflows place instances of these onto
/// their canvas; the polymorphic `metadata` is interpreted per `node_type`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "node_library")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub node_type: String,
    pub base_label: String,
    pub base_description: String,
    pub metadata: Json,
    pub modified_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
