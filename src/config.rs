use crate::error::{AppError, ConfigError, InputError};

/// 程序配置
#[derive(Clone)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 单次生成的最大输出长度
    pub llm_max_output_tokens: u32,
    /// 结构化生成的最大尝试次数
    pub max_attempts: usize,

    // --- 检索配置 ---
    /// 每道题从评价文件中检索的片段数
    pub policy_top_k: usize,
    /// 每道题从学生用书中检索的片段数
    pub book_top_k: usize,
    /// 片段长度（字符）
    pub chunk_size: usize,
    /// 相邻片段重叠长度（字符）
    pub chunk_overlap: usize,

    // --- 流程配置 ---
    /// 题目抽取时发送给模型的试卷文本上限（字符）
    pub max_exam_chars: usize,
    /// 同时分析的题目数量（1 = 完全顺序执行）
    pub max_concurrent_items: usize,
    /// 同时处理的审计任务数量
    pub max_concurrent_jobs: usize,
    /// 单题分析失败时是否只跳过该题（否则中止整次运行）
    pub isolate_item_failures: bool,

    // --- 文件配置 ---
    /// 审计任务 TOML 文件所在目录
    pub jobs_folder: String,
    /// 报告输出目录
    pub output_folder: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 外部文本提取服务地址（未设置时按纯文本读取）
    pub extraction_service_url: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_max_output_tokens: 2048,
            max_attempts: 3,
            policy_top_k: 4,
            book_top_k: 3,
            chunk_size: 1200,
            chunk_overlap: 200,
            max_exam_chars: 12000,
            max_concurrent_items: 4,
            max_concurrent_jobs: 2,
            isolate_item_failures: true,
            jobs_folder: "audit_jobs".to_string(),
            output_folder: "reports".to_string(),
            output_log_file: "audit_log.txt".to_string(),
            extraction_service_url: None,
            verbose_logging: false,
        }
    }
}

// 凭据不进入任何诊断输出
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("llm_api_key", &"<redacted>")
            .field("llm_api_base_url", &self.llm_api_base_url)
            .field("llm_model_name", &self.llm_model_name)
            .field("llm_max_output_tokens", &self.llm_max_output_tokens)
            .field("max_attempts", &self.max_attempts)
            .field("policy_top_k", &self.policy_top_k)
            .field("book_top_k", &self.book_top_k)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("max_exam_chars", &self.max_exam_chars)
            .field("max_concurrent_items", &self.max_concurrent_items)
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("isolate_item_failures", &self.isolate_item_failures)
            .field("jobs_folder", &self.jobs_folder)
            .field("output_folder", &self.output_folder)
            .field("output_log_file", &self.output_log_file)
            .field("extraction_service_url", &self.extraction_service_url)
            .field("verbose_logging", &self.verbose_logging)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            llm_max_output_tokens: env_parse("LLM_MAX_OUTPUT_TOKENS").unwrap_or(default.llm_max_output_tokens),
            max_attempts: env_parse("MAX_ATTEMPTS").unwrap_or(default.max_attempts),
            policy_top_k: env_parse("POLICY_TOP_K").unwrap_or(default.policy_top_k),
            book_top_k: env_parse("BOOK_TOP_K").unwrap_or(default.book_top_k),
            chunk_size: env_parse("CHUNK_SIZE").unwrap_or(default.chunk_size),
            chunk_overlap: env_parse("CHUNK_OVERLAP").unwrap_or(default.chunk_overlap),
            max_exam_chars: env_parse("MAX_EXAM_CHARS").unwrap_or(default.max_exam_chars),
            max_concurrent_items: env_parse("MAX_CONCURRENT_ITEMS").unwrap_or(default.max_concurrent_items),
            max_concurrent_jobs: env_parse("MAX_CONCURRENT_JOBS").unwrap_or(default.max_concurrent_jobs),
            isolate_item_failures: env_parse("ISOLATE_ITEM_FAILURES").unwrap_or(default.isolate_item_failures),
            jobs_folder: std::env::var("JOBS_FOLDER").unwrap_or(default.jobs_folder),
            output_folder: std::env::var("OUTPUT_FOLDER").unwrap_or(default.output_folder),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            extraction_service_url: std::env::var("EXTRACTION_SERVICE_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            verbose_logging: env_parse("VERBOSE_LOGGING").unwrap_or(default.verbose_logging),
        }
    }

    /// 启动前检查：缺少凭据或参数不合法时流程不会开始
    pub fn validate(&self) -> Result<(), AppError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(InputError::MissingCredential {
                var_name: "LLM_API_KEY".to_string(),
            }
            .into());
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "CHUNK_SIZE".to_string(),
                reason: "必须大于 0".to_string(),
            }
            .into());
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(ConfigError::InvalidValue {
                name: "CHUNK_OVERLAP".to_string(),
                reason: format!("必须小于 CHUNK_SIZE ({})", self.chunk_size),
            }
            .into());
        }
        if self.max_concurrent_items == 0 || self.max_concurrent_jobs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "MAX_CONCURRENT_*".to_string(),
                reason: "并发数必须大于 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// 读取并解析环境变量；值无法解析时记录警告并回退到默认值
fn env_parse<T: std::str::FromStr>(var_name: &str) -> Option<T> {
    let value = std::env::var(var_name).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            let err = ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            };
            tracing::warn!("{}，使用默认值", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            llm_api_key: "sk-very-secret".to_string(),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(AppError::Input(InputError::MissingCredential { .. }))
        ));
    }

    #[test]
    fn test_validate_rejects_overlap_not_smaller_than_size() {
        let config = Config {
            llm_api_key: "key".to_string(),
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
