use sea_orm_migration::prelude::*;
use serde_json::json;
use uuid::Uuid;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// The eight node blueprints the alerting workflows are assembled from.
/// The weather node keeps its historical "integration" tag.
fn blueprints() -> Vec<(&'static str, &'static str, &'static str, serde_json::Value)> {
    vec![
        ("start", "Start", "Entry point of the workflow", json!({})),
        ("end", "End", "Terminal point of the workflow", json!({})),
        (
            "form",
            "User Input",
            "Collects name, email and city from the caller",
            json!({
                "inputFields": ["name", "email", "city"],
                "outputVariables": ["name", "email", "city"]
            }),
        ),
        (
            "condition",
            "Check Condition",
            "Compares a runtime variable against a threshold",
            json!({
                "conditionVariable": "temperature",
                "outputVariables": ["conditionMet"]
            }),
        ),
        (
            "integration",
            "Weather API",
            "Fetches the current temperature for the selected city",
            json!({
                "apiEndpoint": "https://api.open-meteo.com/v1/forecast",
                "inputVariables": ["city"],
                "outputVariables": ["temperature"],
                "options": [
                    {"city": "Sydney", "lat": -33.8688, "lon": 151.2093},
                    {"city": "Melbourne", "lat": -37.8136, "lon": 144.9631},
                    {"city": "Brisbane", "lat": -27.4698, "lon": 153.0251},
                    {"city": "Perth", "lat": -31.9505, "lon": 115.8605}
                ]
            }),
        ),
        (
            "email",
            "Send Alert Email",
            "Emails the weather alert to the caller",
            json!({
                "inputVariables": ["name", "city", "temperature"],
                "outputVariables": ["emailSent"],
                "emailTemplate": {
                    "subject": "Weather alert for {{city}}",
                    "body": "Hi {{name}}, the temperature in {{city}} is {{temperature}} degrees."
                }
            }),
        ),
        (
            "sms",
            "Send Alert SMS",
            "Texts the alert to the caller's phone",
            json!({
                "inputVariables": ["phone", "message"],
                "outputVariables": ["smsSent"]
            }),
        ),
        (
            "flood",
            "Flood Risk API",
            "Fetches river discharge and flood risk for the selected city",
            json!({
                "apiEndpoint": "https://flood-api.open-meteo.com/v1/flood",
                "inputVariables": ["city"],
                "outputVariables": ["floodRisk"],
                "options": [
                    {"city": "Sydney", "lat": -33.8688, "lon": 151.2093},
                    {"city": "Brisbane", "lat": -27.4698, "lon": 153.0251}
                ]
            }),
        ),
    ]
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (node_type, label, description, metadata) in blueprints() {
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(NodeLibrary::Table)
                        .columns([
                            NodeLibrary::Id,
                            NodeLibrary::NodeType,
                            NodeLibrary::BaseLabel,
                            NodeLibrary::BaseDescription,
                            NodeLibrary::Metadata,
                        ])
                        .values_panic([
                            Uuid::new_v4().into(),
                            node_type.into(),
                            label.into(),
                            description.into(),
                            metadata.into(),
                        ])
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let types: Vec<&str> = blueprints().into_iter().map(|(t, _, _, _)| t).collect();
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(NodeLibrary::Table)
                    .and_where(Expr::col(NodeLibrary::NodeType).is_in(types))
                    .to_owned(),
            )
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
}
