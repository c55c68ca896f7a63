use sea_orm::entity::prelude::*;

/// A directed connection between two node instances of one workflow.
/// Composite foreign keys pin both endpoints to the same workflow.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workflow_edges")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub workflow_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub edge_id: String,
    pub source_instance_id: String,
    pub target_instance_id: String,
    pub source_handle: Option<String>,
    pub edge_type: String,
    pub animated: bool,
    pub label: Option<String>,
    pub style_props: Option<Json>,
    pub label_style: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
