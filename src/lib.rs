//! CodeDrop - 临时文件中转服务
//!
//! 上传文件后获得一个便于手动输入的取件码，另一方在有效期内凭码取回文件，
//! 文件取回一次即被删除。基于 Actix Web 构建。
//!
//! # 架构
//! - `cache`: 内存中的按客户端限流窗口
//! - `config`: 配置管理
//! - `errors`: 统一错误处理
//! - `middlewares`: 限流中间件
//! - `models`: 数据模型定义
//! - `routes`: API 路由层
//! - `runtime`: 运行时生命周期管理与后台清扫
//! - `services`: 请求处理层
//! - `storage`: 临时文件存储（取件码映射、过期、完整性校验）
//! - `utils`: 工具函数

pub mod cache;
pub mod config;
pub mod errors;
pub mod middlewares;
pub mod models;
pub mod routes;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
