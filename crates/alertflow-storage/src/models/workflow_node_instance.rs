use sea_orm::entity::prelude::*;

/// A placement of a library blueprint onto a workflow's canvas.
/// `instance_id` is human-readable and unique within its workflow.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "workflow_node_instances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub workflow_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub instance_id: String,
    pub node_library_id: Uuid,
    pub x_pos: f64,
    pub y_pos: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
