//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量任务处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载审计任务（Vec<AuditJob>）
//! - 控制并发数量（Semaphore）
//! - 持有模型网关和文本提取器
//! - 写出报告并输出全局统计信息
//!
//! ### `audit_processor` - 单次审计处理器
//! - 提取文档文本，抽取题目列表（Vec<ExamItem>）
//! - 创建并复用 ItemFlow，逐题并发分析
//! - 隔离单题失败
//! - 计算统计表并生成总评
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<AuditJob>)
//!     ↓
//! audit_processor (处理 Vec<ExamItem>)
//!     ↓
//! workflow::ItemFlow (处理单个 ExamItem)
//!     ↓
//! services (能力层：retriever / classifier / structured_client / working_table)
//!     ↓
//! infrastructure (基础设施：OpenAiGateway / Extractor)
//! ```

pub mod audit_processor;
pub mod batch_processor;

// 重新导出主要类型
pub use audit_processor::{AuditInputs, AuditProcessor};
pub use batch_processor::App;
