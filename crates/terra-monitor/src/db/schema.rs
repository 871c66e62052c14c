use super::{alert, monitoring_state, region};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema, Statement};
use tracing::debug;

/// 同一 (region, disaster_type) 至多一条 active 告警
///
/// SQLite 与 PostgreSQL 都支持部分索引。
pub const ACTIVE_ALERT_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS ux_alerts_active \
     ON alerts (region_id, disaster_type) WHERE status = 'active'";

const ALERT_LOOKUP_INDEX: &str = "CREATE INDEX IF NOT EXISTS ix_alerts_region_status \
     ON alerts (region_id, status)";

/// 创建表结构（幂等）
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    create_table(db, region::Entity).await?;
    create_table(db, monitoring_state::Entity).await?;
    create_table(db, alert::Entity).await?;

    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, ACTIVE_ALERT_INDEX.to_string()))
        .await?;
    db.execute(Statement::from_string(backend, ALERT_LOOKUP_INDEX.to_string()))
        .await?;

    debug!("Monitoring schema ready");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Database;

    #[tokio::test]
    async fn test_setup_schema_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        setup_schema(&db).await.unwrap();
        setup_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_active_alert_is_rejected_by_storage() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        setup_schema(&db).await.unwrap();

        // alerts.region_id 引用 regions.id
        db.execute(Statement::from_string(
            db.get_database_backend(),
            "INSERT INTO regions (id, name, min_latitude, max_latitude, min_longitude, \
             max_longitude, center_latitude, center_longitude, is_monitored, created_at) VALUES \
             ('reg_1', 'Delta', 0, 1, 0, 1, 0.5, 0.5, 1, '2024-01-01T00:00:00Z')"
                .to_string(),
        ))
        .await
        .unwrap();

        let insert = |id: &str, status: &str| {
            Statement::from_string(
                db.get_database_backend(),
                format!(
                    "INSERT INTO alerts (id, region_id, disaster_type, severity, status, title, \
                     description, latitude, longitude, confidence, prediction_model, \
                     estimated_affected_population, detected_at) VALUES \
                     ('{id}', 'reg_1', 'fire', 'high', '{status}', 't', '', 0, 0, 0.9, 'm', 0, \
                     '2024-01-01T00:00:00Z')"
                ),
            )
        };

        db.execute(insert("a1", "active")).await.unwrap();
        // 已关闭的同类告警不受约束
        db.execute(insert("a2", "resolved")).await.unwrap();
        db.execute(insert("a3", "resolved")).await.unwrap();

        let result = db.execute(insert("a4", "active")).await;
        assert!(result.is_err());
    }
}
