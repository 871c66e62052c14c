use chrono::{DateTime as ChronoDateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 区域实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "regions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub name: String,
    pub description: Option<String>,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub is_monitored: bool,
    pub population: Option<i64>,
    pub created_at: ChronoDateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::alert::Entity")]
    Alert,
    #[sea_orm(has_one = "super::monitoring_state::Entity")]
    MonitoringState,
}

impl Related<super::alert::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Alert.def()
    }
}

impl Related<super::monitoring_state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitoringState.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub mod region {
    pub use super::{ActiveModel, Column, Entity, Model, PrimaryKey, Relation};
}

/// 区域监控状态实体（每个区域一行）
pub mod monitoring_state {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "monitoring_states")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub region_id: String,
        pub is_active: bool,
        pub last_cycle_at: Option<ChronoDateTime<Utc>>,
        pub last_data_fetch_at: Option<ChronoDateTime<Utc>>,
        pub threat_level: String,
        pub anomaly_count: i32,
        pub last_cycle_duration: f64,
        pub cpu_usage: Option<f64>,
        pub memory_usage: Option<f64>,
        pub updated_at: ChronoDateTime<Utc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::region::Entity",
            from = "Column::RegionId",
            to = "super::region::Column::Id"
        )]
        Region,
    }

    impl Related<super::region::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Region.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// 告警实体
///
/// (region_id, disaster_type) 上 status = 'active' 的部分唯一索引见 `schema.rs`。
pub mod alert {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
    #[sea_orm(table_name = "alerts")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub region_id: String,
        pub disaster_type: String,
        pub severity: String,
        pub status: String,
        pub title: String,
        pub description: String,
        pub latitude: f64,
        pub longitude: f64,
        pub confidence: f64,
        pub prediction_model: String,
        pub estimated_affected_population: i64,
        pub detected_at: ChronoDateTime<Utc>,
        pub acknowledged_at: Option<ChronoDateTime<Utc>>,
        pub acknowledged_by: Option<String>,
        pub resolved_at: Option<ChronoDateTime<Utc>>,
        pub resolved_by: Option<String>,
        pub dismissed_at: Option<ChronoDateTime<Utc>>,
        pub dismissed_by: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::region::Entity",
            from = "Column::RegionId",
            to = "super::region::Column::Id"
        )]
        Region,
    }

    impl Related<super::region::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Region.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
