//! # Exam Audit
//!
//! 基于大模型的试卷审计工具：逐题给出评价目标分类、意见和修改建议，
//! 并生成统计表与总评。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部资源，只暴露能力
//! - `OpenAiGateway` - 唯一的模型客户端持有者，提供 generate() 能力
//! - `Extractor` - 文档文本提取（本地纯文本 / 远程服务）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `DocumentIndex` - 分块与关键词检索
//! - `HeuristicClassifier` - 基于触发词的评价目标预判
//! - `json_repair` - 修复常见的模型输出格式问题
//! - `StructuredClient` - 带重试的结构化生成
//! - `working_table` / `ReportWriter` - 统计表与报告输出
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一道题"的完整处理流程
//! - `ItemCtx` - 上下文封装（run + 题号）
//! - `ItemFlow` - 流程编排（检索 → 预判 → 分析 → 重新分类）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量任务处理器，管理资源和并发
//! - `orchestrator/audit_processor` - 单次审计处理器，遍历题目列表
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{Extractor, GenerativeModel, OpenAiGateway, TextExtractor};
pub use models::{AuditMeta, AuditReport, ExamItem};
pub use orchestrator::{App, AuditInputs, AuditProcessor};
pub use workflow::{ItemCtx, ItemFlow};
