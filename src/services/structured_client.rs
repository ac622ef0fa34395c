//! 结构化生成服务 - 业务能力层
//!
//! 在模型调用外面套一层"必须返回合法 JSON"的约定：
//! 第一次用最严格的采样配置；解析失败后用修复提示重新请求，
//! 把上一次的原始输出和解析错误一起交给模型。
//! 重试只是重新提示，不做时间退避；模型调用本身失败时原样上报，不重试。

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, MalformedOutput};
use crate::infrastructure::{GenerativeModel, SamplingConfig};
use crate::services::json_repair::{parse_structured_as, ParseOutcome};
use crate::services::prompts::repair_prompt;

/// 输出约定：名称（用于日志与错误）和必须保留的键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputContract {
    pub name: &'static str,
    pub keys: &'static [&'static str],
}

/// 一次成功的结构化生成
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    /// 最后一次（即成功那次）的原始输出
    pub raw: String,
    /// 第几次尝试成功
    pub attempts: usize,
    /// 是否经过本地修复
    pub repaired: bool,
}

/// 结构化生成客户端
pub struct StructuredClient<M> {
    model: M,
    max_attempts: usize,
    max_output_tokens: Option<u32>,
}

impl<M: GenerativeModel> StructuredClient<M> {
    /// `max_attempts == 0` 按 1 处理
    pub fn new(model: M, max_attempts: usize) -> Self {
        Self {
            model,
            max_attempts: max_attempts.max(1),
            max_output_tokens: None,
        }
    }

    pub fn from_config(model: M, config: &Config) -> Self {
        Self::new(model, config.max_attempts).with_max_output_tokens(config.llm_max_output_tokens)
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// 请求结构化输出并解析为 `T`
    ///
    /// 终态只有两个：成功返回 `Generated<T>`，或连续 `max_attempts` 次解析失败后返回
    /// `AppError::GenerationExhausted`。`AppError::ExternalService` 直接向上传递。
    pub async fn generate<T: DeserializeOwned>(
        &self,
        prompt: &str,
        contract: &OutputContract,
    ) -> AppResult<Generated<T>> {
        let sampling = SamplingConfig::strict(self.max_output_tokens);
        let mut current_prompt = prompt.to_string();
        let mut last_raw = String::new();
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            let raw = self.model.generate(&current_prompt, &sampling).await?;
            debug!(
                "[{}] 第 {}/{} 次尝试，收到 {} 字符",
                contract.name,
                attempt,
                self.max_attempts,
                raw.chars().count()
            );

            match parse_response::<T>(&raw) {
                Ok(outcome) => {
                    if attempt > 1 {
                        debug!("[{}] 第 {} 次尝试解析成功", contract.name, attempt);
                    }
                    return Ok(Generated {
                        value: outcome.value,
                        raw,
                        attempts: attempt,
                        repaired: outcome.repaired,
                    });
                }
                Err(malformed) => {
                    warn!(
                        "⚠️ [{}] 第 {}/{} 次输出无法解析: {}",
                        contract.name,
                        attempt,
                        self.max_attempts,
                        malformed.feedback()
                    );
                    last_error = malformed.feedback().to_string();
                    current_prompt = repair_prompt(contract, &raw, &last_error);
                    last_raw = raw;
                }
            }
        }

        Err(AppError::GenerationExhausted {
            contract: contract.name.to_string(),
            attempts: self.max_attempts,
            last_error,
            last_raw,
        })
    }
}

/// 空内容同样按解析失败处理
fn parse_response<T: DeserializeOwned>(raw: &str) -> Result<ParseOutcome<T>, MalformedOutput> {
    if raw.trim().is_empty() {
        return Err(MalformedOutput {
            strict_error: "empty response".to_string(),
            repaired_error: "empty response".to_string(),
            raw: String::new(),
        });
    }
    parse_structured_as(raw)
}
