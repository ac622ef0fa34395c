//! 基础设施层：持有外部资源（模型客户端、HTTP 客户端），只暴露能力

pub mod model_gateway;
pub mod text_extractor;

pub use model_gateway::{GenerativeModel, OpenAiGateway, SamplingConfig};
pub use text_extractor::{Extractor, PlainTextExtractor, RemoteExtractor, TextExtractor};
