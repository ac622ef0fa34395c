//! 题目处理上下文
//!
//! 封装"我正在处理哪次审计的第几题"这一信息

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone)]
pub struct ItemCtx {
    /// 审计任务名称（仅用于日志显示）
    pub run_name: String,

    /// 题号
    pub ordinal: u32,

    /// 本次运行的题目总数
    pub total_items: usize,
}

impl ItemCtx {
    pub fn new(run_name: impl Into<String>, ordinal: u32, total_items: usize) -> Self {
        Self {
            run_name: run_name.into(),
            ordinal,
            total_items,
        }
    }
}

impl Display for ItemCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[审计 {} 题目#{}/{}]",
            self.run_name, self.ordinal, self.total_items
        )
    }
}
