//! # ATS Autofill
//!
//! 自动填写并提交招聘系统（ATS）职位申请表的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露页面能力
//! - `FormPage` - 页面能力接口，测试里用内存假页面替代
//! - `JsExecutor` - 唯一的 page owner，把每个能力翻译成一段脚本
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个字段
//! - `FieldScanner` - 扫描并分类表单控件
//! - `AnswerResolver` - 按层级解析答案（预设 → 上下文 → 生成式）
//! - `DropdownController` - 提交选择并回读校验
//! - `LlmService` - 生成式回答能力
//! - `OutcomeStore` - 申请记录（去重 / 每日额度）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个职位"的完整处理流程
//! - `FillExecutor` - 扫描 → 解析 → 提交，动态追加新字段
//! - `ReviewGate` - 提交前人工审核
//! - `SubmissionController` - 完整性检查、提交、结果判断
//! - `ApplicationFlow` - 把以上步骤串成一次申请
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量申请处理器，管理浏览器和并发
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{FormError, LoadError};
pub use infrastructure::{FormPage, JsExecutor};
pub use models::{ApplicationSession, FieldDescriptor, FieldKind, JobRef, SessionState};
pub use orchestrator::App;
pub use workflow::{ApplicationFlow, CancelFlag};
