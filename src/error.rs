use thiserror::Error;

use crate::models::DocumentRole;

/// 应用程序错误类型
///
/// 与审计流程的失败分类一一对应：
/// - `Input` / `Config`：流程尚未开始就被拒绝
/// - `ExtractionEmpty`：文档没有可用文本
/// - `GenerationExhausted`：重试次数耗尽（单次解析失败 `MalformedOutput` 只在重试循环内部流转）
/// - `ExternalService`：模型或文本提取服务的网络/鉴权失败
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入错误（缺少文档或凭据）
    #[error("输入错误: {0}")]
    Input(#[from] InputError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),

    /// 文档没有可用文本
    #[error("文档没有可用文本: {role}")]
    ExtractionEmpty { role: DocumentRole },

    /// 多次重新提示后仍无法得到合法输出
    #[error(
        "结构化生成失败 ({contract}), 已尝试 {attempts} 次: {last_error}\n最后一次原始输出: {}",
        truncate_raw(.last_raw)
    )]
    GenerationExhausted {
        contract: String,
        attempts: usize,
        last_error: String,
        last_raw: String,
    },

    /// 外部服务错误（网络、鉴权），原样上报，不做重试
    #[error("外部服务调用失败 ({service}): {source}")]
    ExternalService {
        service: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 抽取到的题目列表为空
    #[error("未能从试卷中抽取到任何题目 ({run})")]
    NoItems { run: String },
}

/// 输入错误
#[derive(Debug, Error)]
pub enum InputError {
    /// 缺少必需的文档
    #[error("缺少必需的文档: {role}")]
    MissingDocument { role: DocumentRole },

    /// 缺少 API 凭据（只报告变量名，不回显内容）
    #[error("缺少 API 凭据: 环境变量 {var_name} 未设置")]
    MissingCredential { var_name: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 配置值不合法
    #[error("配置项 {name} 不合法: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 严格解析与修复后解析都失败
#[derive(Debug, Clone, Error)]
#[error("严格解析失败: {strict_error}; 修复后解析失败: {repaired_error}")]
pub struct MalformedOutput {
    pub strict_error: String,
    pub repaired_error: String,
    pub raw: String,
}

impl MalformedOutput {
    /// 反馈给模型的错误描述（取修复后的错误，它更接近最终文本）
    pub fn feedback(&self) -> &str {
        &self.repaired_error
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建 LLM 服务调用错误
    pub fn llm_failed(model: &str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::ExternalService {
            service: format!("llm:{}", model),
            source: Box::new(source),
        }
    }

    /// 创建文本提取服务调用错误
    pub fn extraction_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AppError::ExternalService {
            service: "text-extraction".to_string(),
            source: Box::new(source),
        }
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为必须中止整个运行的错误
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AppError::GenerationExhausted { .. })
    }
}

/// 诊断输出中只保留原始输出的开头部分
fn truncate_raw(raw: &str) -> String {
    crate::utils::logging::truncate_text(raw, 500)
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
