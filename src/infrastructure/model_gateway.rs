//! 模型网关 - 基础设施层
//!
//! 唯一持有 `async-openai` 客户端的地方，只暴露"生成文本"的能力

use std::future::Future;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// 采样配置
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingConfig {
    /// 0 = 完全确定
    pub temperature: f32,
    /// 要求只输出结构化数据
    pub json_output: bool,
    /// 输出长度上限
    pub max_output_tokens: Option<u32>,
}

impl SamplingConfig {
    /// 最严格的配置：确定性采样 + JSON 输出
    pub fn strict(max_output_tokens: Option<u32>) -> Self {
        Self {
            temperature: 0.0,
            json_output: true,
            max_output_tokens,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self::strict(None)
    }
}

/// 生成式模型
///
/// 生产环境由 `OpenAiGateway` 实现；测试中用脚本化的模型替代。
/// 返回 `Err` 只表示调用本身失败（网络、鉴权），内容是否可用由调用方判断。
pub trait GenerativeModel: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> impl Future<Output = AppResult<String>> + Send;
}

const JSON_SYSTEM_HINT: &str =
    "You are an exam audit assistant. Respond with a single valid JSON object and nothing else.";

/// OpenAI 兼容接口的模型网关
///
/// 职责：
/// - 持有唯一的 `Client<OpenAIConfig>`
/// - 把 `SamplingConfig` 翻译成请求参数
/// - 不认识题目 / 报告
/// - 不做重试
pub struct OpenAiGateway {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl OpenAiGateway {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn send(&self, prompt: &str, sampling: &SamplingConfig) -> AppResult<String> {
        debug!(
            "调用 LLM API，模型: {}，提示词长度: {} 字符",
            self.model_name,
            prompt.chars().count()
        );

        let mut messages = Vec::new();
        if sampling.json_output {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(JSON_SYSTEM_HINT)
                .build()
                .map_err(|e| AppError::llm_failed(&self.model_name, e))?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::llm_failed(&self.model_name, e))?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model_name)
            .messages(messages)
            .temperature(sampling.temperature);
        if sampling.json_output {
            builder.response_format(ResponseFormat::JsonObject);
        }
        if let Some(max_tokens) = sampling.max_output_tokens {
            builder.max_tokens(max_tokens);
        }
        let request = builder
            .build()
            .map_err(|e| AppError::llm_failed(&self.model_name, e))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_failed(&self.model_name, e)
        })?;

        debug!("LLM API 调用成功");

        // 空内容交给上层按"无法解析"处理
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

impl GenerativeModel for OpenAiGateway {
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> AppResult<String> {
        self.send(prompt, sampling).await
    }
}

impl<M: GenerativeModel> GenerativeModel for &M {
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> AppResult<String> {
        (**self).generate(prompt, sampling).await
    }
}
