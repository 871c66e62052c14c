use crate::db::region;
use crate::error::{MonitorError, Result};
use crate::model::{GeoBounds, Region, RegionFilter};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// 区域注册表
///
/// 负责区域的注册、查询和监控开关。区域定义创建后不可变，
/// 因此按 ID 读取可以走内存缓存。
pub struct RegionRegistry {
    db: Arc<DatabaseConnection>,

    /// 内存缓存（区域ID -> 区域）
    cache: Arc<RwLock<HashMap<String, Region>>>,
}

impl RegionRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 注册区域
    ///
    /// # 错误
    /// * `AlreadyExists` - ID 或名称已存在
    /// * `Validation` - 名称为空或包围盒非法
    pub async fn register(&self, region: Region) -> Result<Region> {
        Self::validate(&region)?;

        if self.exists(&region.id).await? {
            return Err(MonitorError::AlreadyExists(region.id.clone()));
        }
        let same_name = region::Entity::find()
            .filter(region::Column::Name.eq(region.name.as_str()))
            .count(&*self.db)
            .await?;
        if same_name > 0 {
            return Err(MonitorError::AlreadyExists(region.name.clone()));
        }

        let active_model: region::ActiveModel = region.clone().into();
        region::Entity::insert(active_model)
            .exec_without_returning(&*self.db)
            .await?;

        info!(region_id = %region.id, region_name = %region.name, "Region registered");

        self.cache
            .write()
            .await
            .insert(region.id.clone(), region.clone());
        Ok(region)
    }

    /// 获取区域，不存在时返回 None
    pub async fn get(&self, region_id: &str) -> Result<Option<Region>> {
        if let Some(region) = self.cache.read().await.get(region_id) {
            debug!(region_id = %region_id, "Region found in cache");
            return Ok(Some(region.clone()));
        }

        let model = region::Entity::find_by_id(region_id.to_string())
            .one(&*self.db)
            .await?;

        match model {
            Some(model) => {
                let region = Region::from(model);
                self.cache
                    .write()
                    .await
                    .insert(region.id.clone(), region.clone());
                Ok(Some(region))
            }
            None => Ok(None),
        }
    }

    /// 获取区域，不存在时返回 `NotFound`
    pub async fn require(&self, region_id: &str) -> Result<Region> {
        self.get(region_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("region", region_id))
    }

    /// 列出区域（按名称排序）
    pub async fn list(&self, filter: RegionFilter) -> Result<Vec<Region>> {
        let models = Self::query(&filter)
            .order_by_asc(region::Column::Name)
            .all(&*self.db)
            .await?;

        let regions: Vec<Region> = models.into_iter().map(Region::from).collect();
        debug!(count = regions.len(), "Regions listed from database");
        Ok(regions)
    }

    /// 纳入周期扫描的区域
    pub async fn list_monitored(&self) -> Result<Vec<Region>> {
        self.list(RegionFilter {
            monitored: Some(true),
            ..Default::default()
        })
        .await
    }

    /// 切换监控开关（区域唯一可变的属性）
    pub async fn set_monitored(&self, region_id: &str, monitored: bool) -> Result<Region> {
        let mut region = self.require(region_id).await?;

        let active_model = region::ActiveModel {
            id: Set(region.id.clone()),
            is_monitored: Set(monitored),
            ..Default::default()
        };
        active_model.update(&*self.db).await?;

        region.is_monitored = monitored;
        self.cache
            .write()
            .await
            .insert(region.id.clone(), region.clone());

        info!(region_id = %region_id, monitored, "Region monitoring toggled");
        Ok(region)
    }

    pub async fn count(&self, filter: RegionFilter) -> Result<u64> {
        let count = Self::query(&filter).count(&*self.db).await?;
        Ok(count)
    }

    pub async fn exists(&self, region_id: &str) -> Result<bool> {
        if self.cache.read().await.contains_key(region_id) {
            return Ok(true);
        }
        let count = region::Entity::find_by_id(region_id.to_string())
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }

    /// 区域表为空时写入默认区域，返回写入数量
    pub async fn seed_defaults(&self) -> Result<usize> {
        let existing = region::Entity::find().count(&*self.db).await?;
        if existing > 0 {
            debug!(existing, "Regions already present, skipping seed");
            return Ok(0);
        }

        let defaults = default_regions();
        let seeded = defaults.len();
        for region in defaults {
            self.register(region).await?;
        }

        info!(count = seeded, "Default regions seeded");
        Ok(seeded)
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    fn query(filter: &RegionFilter) -> Select<region::Entity> {
        let mut query = region::Entity::find();
        if let Some(monitored) = filter.monitored {
            query = query.filter(region::Column::IsMonitored.eq(monitored));
        }
        if let Some(name) = &filter.name {
            query = query.filter(region::Column::Name.eq(name.as_str()));
        }
        query
    }

    fn validate(region: &Region) -> Result<()> {
        if region.id.is_empty() {
            return Err(MonitorError::validation("Region ID cannot be empty"));
        }
        if region.name.trim().is_empty() {
            return Err(MonitorError::validation("Region name cannot be empty"));
        }
        if region.name.len() > 100 {
            return Err(MonitorError::validation(
                "Region name too long (max 100 characters)",
            ));
        }
        if !region.bounds.is_valid() {
            return Err(MonitorError::validation(format!(
                "Region {} has invalid bounds {:?}",
                region.name, region.bounds
            )));
        }
        Ok(())
    }
}

/// 默认区域：五个印度城市
pub fn default_regions() -> Vec<Region> {
    let city = |name: &str,
                description: &str,
                bounds: GeoBounds,
                center: (f64, f64),
                population: i64| {
        Region::new(name, bounds)
            .with_description(description)
            .with_center(center.0, center.1)
            .with_population(population)
    };

    vec![
        city(
            "Bangalore",
            "Silicon Valley of India - Technology hub with high population density",
            GeoBounds::new(12.7342, 13.1419, 77.4601, 77.7864),
            (12.9716, 77.5946),
            12_500_000,
        ),
        city(
            "Delhi",
            "National Capital Territory - High population and infrastructure density",
            GeoBounds::new(28.4041, 28.8833, 76.8388, 77.3465),
            (28.7041, 77.1025),
            30_000_000,
        ),
        city(
            "Pune",
            "Cultural capital of Maharashtra - Educational and IT hub",
            GeoBounds::new(18.4088, 18.6347, 73.7306, 73.9787),
            (18.5204, 73.8567),
            7_500_000,
        ),
        city(
            "Mumbai",
            "Financial capital of India - Coastal megacity",
            GeoBounds::new(18.8925, 19.2760, 72.7758, 72.9969),
            (19.0760, 72.8777),
            20_000_000,
        ),
        city(
            "Jammu",
            "Winter capital of Jammu and Kashmir - Mountainous terrain",
            GeoBounds::new(32.6181, 32.7913, 74.7972, 75.0338),
            (32.7266, 74.8570),
            1_500_000,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_schema;
    use sea_orm::Database;

    async fn setup() -> RegionRegistry {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        setup_schema(&db).await.unwrap();
        RegionRegistry::new(Arc::new(db))
    }

    fn delta() -> Region {
        Region::new("Delta", GeoBounds::new(10.0, 11.0, 20.0, 21.0)).with_id("reg_delta")
    }

    #[tokio::test]
    async fn test_register_and_get() {
        let registry = setup().await;
        registry.register(delta()).await.unwrap();

        registry.clear_cache().await;
        let region = registry.get("reg_delta").await.unwrap().unwrap();
        assert_eq!(region.name, "Delta");
        assert_eq!(region.center_latitude, 10.5);
        assert!(region.is_monitored);
    }

    #[tokio::test]
    async fn test_duplicate_id_and_name_rejected() {
        let registry = setup().await;
        registry.register(delta()).await.unwrap();

        let result = registry.register(delta()).await;
        assert!(matches!(result, Err(MonitorError::AlreadyExists(_))));

        let same_name = Region::new("Delta", GeoBounds::new(0.0, 1.0, 0.0, 1.0));
        let result = registry.register(same_name).await;
        assert!(matches!(result, Err(MonitorError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_invalid_region_rejected() {
        let registry = setup().await;

        let inverted = Region::new("Inverted", GeoBounds::new(11.0, 10.0, 20.0, 21.0));
        assert!(matches!(
            registry.register(inverted).await,
            Err(MonitorError::Validation(_))
        ));

        let unnamed = Region::new("  ", GeoBounds::new(10.0, 11.0, 20.0, 21.0));
        assert!(matches!(
            registry.register(unnamed).await,
            Err(MonitorError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_monitored_and_toggle() {
        let registry = setup().await;
        registry.register(delta()).await.unwrap();
        registry
            .register(Region::new("Echo", GeoBounds::new(0.0, 1.0, 0.0, 1.0)).unmonitored())
            .await
            .unwrap();

        let monitored = registry.list_monitored().await.unwrap();
        assert_eq!(monitored.len(), 1);
        assert_eq!(monitored[0].name, "Delta");

        registry.set_monitored("reg_delta", false).await.unwrap();
        assert!(registry.list_monitored().await.unwrap().is_empty());
        assert!(!registry.get("reg_delta").await.unwrap().unwrap().is_monitored);
        assert_eq!(registry.count(RegionFilter::default()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_seed_defaults_only_once() {
        let registry = setup().await;
        assert_eq!(registry.seed_defaults().await.unwrap(), 5);
        assert_eq!(registry.seed_defaults().await.unwrap(), 0);

        let regions = registry.list(RegionFilter::default()).await.unwrap();
        let names: Vec<_> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Bangalore", "Delhi", "Jammu", "Mumbai", "Pune"]);

        let delhi = regions.iter().find(|r| r.name == "Delhi").unwrap();
        assert_eq!(delhi.population, Some(30_000_000));
        assert_eq!(delhi.center_longitude, 77.1025);
    }

    #[tokio::test]
    async fn test_set_monitored_unknown_region() {
        let registry = setup().await;
        let result = registry.set_monitored("reg_missing", true).await;
        assert!(matches!(result, Err(MonitorError::NotFound(_))));
    }
}
