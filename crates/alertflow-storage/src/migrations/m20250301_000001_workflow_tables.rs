use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. node_library: shared blueprints, soft-deletable.
        manager
            .create_table(
                Table::create()
                    .table(NodeLibrary::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NodeLibrary::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(NodeLibrary::NodeType).string().not_null())
                    .col(ColumnDef::new(NodeLibrary::BaseLabel).string().not_null())
                    .col(
                        ColumnDef::new(NodeLibrary::BaseDescription)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(NodeLibrary::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(NodeLibrary::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(NodeLibrary::DeletedAt)
                            .timestamp_with_time_zone(),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. workflows: the container, soft-deletable.
        manager
            .create_table(
                Table::create()
                    .table(Workflows::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Workflows::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Workflows::Name).string().not_null())
                    .col(
                        ColumnDef::new(Workflows::Status)
                            .string()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Workflows::ActiveSnapshotId).uuid())
                    .col(
                        ColumnDef::new(Workflows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Workflows::ModifiedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Workflows::DeletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // 3. workflow_node_instances: canvas placements, composite PK.
        manager
            .create_table(
                Table::create()
                    .table(WorkflowNodeInstances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkflowNodeInstances::WorkflowId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowNodeInstances::InstanceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowNodeInstances::NodeLibraryId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowNodeInstances::XPos)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowNodeInstances::YPos)
                            .double()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(WorkflowNodeInstances::WorkflowId)
                            .col(WorkflowNodeInstances::InstanceId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_node_instances_workflow")
                            .from(
                                WorkflowNodeInstances::Table,
                                WorkflowNodeInstances::WorkflowId,
                            )
                            .to(Workflows::Table, Workflows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_node_instances_library")
                            .from(
                                WorkflowNodeInstances::Table,
                                WorkflowNodeInstances::NodeLibraryId,
                            )
                            .to(NodeLibrary::Table, NodeLibrary::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 4. workflow_edges: composite PK and composite FKs pinning both
        // endpoints to node instances of the same workflow.
        manager
            .create_table(
                Table::create()
                    .table(WorkflowEdges::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(WorkflowEdges::WorkflowId).uuid().not_null())
                    .col(ColumnDef::new(WorkflowEdges::EdgeId).string().not_null())
                    .col(
                        ColumnDef::new(WorkflowEdges::SourceInstanceId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowEdges::TargetInstanceId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkflowEdges::SourceHandle).string())
                    .col(ColumnDef::new(WorkflowEdges::EdgeType).string().not_null())
                    .col(
                        ColumnDef::new(WorkflowEdges::Animated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(WorkflowEdges::Label).string())
                    .col(ColumnDef::new(WorkflowEdges::StyleProps).json())
                    .col(ColumnDef::new(WorkflowEdges::LabelStyle).json())
                    .primary_key(
                        Index::create()
                            .col(WorkflowEdges::WorkflowId)
                            .col(WorkflowEdges::EdgeId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_edges_source_instance")
                            .from_tbl(WorkflowEdges::Table)
                            .from_col(WorkflowEdges::WorkflowId)
                            .from_col(WorkflowEdges::SourceInstanceId)
                            .to_tbl(WorkflowNodeInstances::Table)
                            .to_col(WorkflowNodeInstances::WorkflowId)
                            .to_col(WorkflowNodeInstances::InstanceId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_edges_target_instance")
                            .from_tbl(WorkflowEdges::Table)
                            .from_col(WorkflowEdges::WorkflowId)
                            .from_col(WorkflowEdges::TargetInstanceId)
                            .to_tbl(WorkflowNodeInstances::Table)
                            .to_col(WorkflowNodeInstances::WorkflowId)
                            .to_col(WorkflowNodeInstances::InstanceId)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 5. workflow_snapshots: immutable published versions.
        manager
            .create_table(
                Table::create()
                    .table(WorkflowSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WorkflowSnapshots::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WorkflowSnapshots::WorkflowId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WorkflowSnapshots::VersionNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WorkflowSnapshots::DagData).json().not_null())
                    .col(
                        ColumnDef::new(WorkflowSnapshots::PublishedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_snapshots_workflow")
                            .from(WorkflowSnapshots::Table, WorkflowSnapshots::WorkflowId)
                            .to(Workflows::Table, Workflows::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_snapshots_workflow_version")
                    .table(WorkflowSnapshots::Table)
                    .col(WorkflowSnapshots::WorkflowId)
                    .col(WorkflowSnapshots::VersionNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WorkflowSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowEdges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WorkflowNodeInstances::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Workflows::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(NodeLibrary::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum NodeLibrary {
    Table,
    Id,
    NodeType,
    BaseLabel,
    BaseDescription,
    Metadata,
    ModifiedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Workflows {
    Table,
    Id,
    Name,
    Status,
    ActiveSnapshotId,
    CreatedAt,
    ModifiedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum WorkflowNodeInstances {
    Table,
    WorkflowId,
    InstanceId,
    NodeLibraryId,
    XPos,
    YPos,
}

#[derive(DeriveIden)]
enum WorkflowEdges {
    Table,
    WorkflowId,
    EdgeId,
    SourceInstanceId,
    TargetInstanceId,
    SourceHandle,
    EdgeType,
    Animated,
    Label,
    StyleProps,
    LabelStyle,
}

#[derive(DeriveIden)]
enum WorkflowSnapshots {
    Table,
    Id,
    WorkflowId,
    VersionNumber,
    DagData,
    PublishedAt,
}
