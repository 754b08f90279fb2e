use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::catalog::InMemoryCatalog;
use crate::core::{Config, Result, ServerError};
use crate::notify::{LogNotifier, NotificationWorker, Notifier};
use crate::orders::OrderOrchestrator;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，每个请求处理器都拿到同一份实例。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Arc<Config> | 配置项 (不可变) |
/// | orders | OrderOrchestrator | 订单编排器 (内部 Arc) |
/// | catalog | Arc<InMemoryCatalog> | 价目表缓存 |
/// | shutdown | CancellationToken | 后台任务关闭信号 |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub orders: OrderOrchestrator,
    pub catalog: Arc<InMemoryCatalog>,
    pub shutdown: CancellationToken,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 1. 创建工作目录
    /// 2. 加载价目表 (CATALOG_PATH)
    /// 3. 打开 redb 数据库并创建编排器
    pub fn initialize(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let catalog = match &config.catalog_path {
            Some(path) => InMemoryCatalog::load_json(path)
                .map_err(|e| ServerError::Config(format!("catalog {path}: {e}")))?,
            None => {
                tracing::warn!("CATALOG_PATH not set, starting with an empty catalog");
                InMemoryCatalog::new()
            }
        };
        let catalog = Arc::new(catalog);

        let orders = OrderOrchestrator::new(&db_path, catalog.clone(), config.branch_policies())?;
        tracing::info!(path = %db_path.display(), "Order database opened");

        Ok(Self::from_parts(config.clone(), orders, catalog))
    }

    /// 用现成的编排器组装状态 (测试用)
    pub fn from_parts(
        config: Config,
        orders: OrderOrchestrator,
        catalog: Arc<InMemoryCatalog>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            orders,
            catalog,
            shutdown: CancellationToken::new(),
        }
    }

    /// 启动后台任务
    pub fn start_background_tasks(&self) {
        self.start_notifications(Arc::new(LogNotifier));
    }

    /// 使用指定通知渠道启动通知任务
    pub fn start_notifications(&self, notifier: Arc<dyn Notifier>) {
        let worker = NotificationWorker::new(self.orders.clone(), notifier, self.shutdown.clone());
        tokio::spawn(worker.run());
    }

    pub fn get_orders(&self) -> &OrderOrchestrator {
        &self.orders
    }
}
