//! Repair Server - 维修服务单生命周期与工作流引擎
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 事件溯源的服务单状态机、账本和编排器
//! - **库存** (`inventory`): 与订单同事务的库存预留
//! - **价目表** (`catalog`): SKU 定价查询
//! - **通知** (`notify`): 提交后的客户通知
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! repair-server/src/
//! ├── core/          # 配置、状态、错误、服务器
//! ├── api/           # HTTP 路由和处理器
//! ├── orders/        # 服务单事件溯源
//! ├── inventory/     # 库存与预留
//! ├── catalog/       # 价目表
//! ├── notify/        # 客户通知
//! └── utils/         # 日志等工具
//! ```

pub mod api;
pub mod catalog;
pub mod core;
pub mod inventory;
pub mod notify;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use catalog::{CatalogEntry, CatalogProvider, InMemoryCatalog};
pub use core::{Config, Server, ServerError, ServerState};
pub use inventory::{InventoryService, InventoryStore};
pub use notify::{LogNotifier, Notification, NotificationWorker, Notifier};
pub use orders::{OrderOrchestrator, OrderStorage, TransitionOutcome};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env, 准备工作目录, 初始化日志
pub fn setup_environment() -> std::io::Result<Config> {
    // .env 不存在时忽略
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let json = config.is_production();
    init_logger_with_file(Some(&config.log_level), Some(json), Some(log_dir.as_path()));
    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
    ____                  _
   / __ \___  ____  ____ (_)____
  / /_/ / _ \/ __ \/ __ `/ / ___/
 / _, _/  __/ /_/ / /_/ / / /
/_/ |_|\___/ .___/\__,_/_/_/
          /_/
    "#
    );
}
