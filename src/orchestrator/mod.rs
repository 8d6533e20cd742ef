//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ### `batch_processor` - 批量申请处理器
//! - 管理应用生命周期（初始化、运行）
//! - 读取职位列表，过滤已投递职位，按每日额度截断
//! - 控制并发数量（Semaphore）
//! - 持有 Browser，为每个会话打开独立标签页
//! - 输出全局统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<JobRef>)
//!     ↓
//! workflow::ApplicationFlow (处理单个职位)
//!     ↓
//! services (能力层：扫描 / 解析答案 / 下拉框 / 记录)
//!     ↓
//! infrastructure (基础设施：FormPage / JsExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 Browser
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计

pub mod batch_processor;

pub use batch_processor::App;
