//! 业务能力层：每个服务描述"我能做什么"，只处理单道题或单个文档，不关心流程顺序

pub mod classifier;
pub mod item_extraction;
pub mod json_repair;
pub mod normalize;
pub mod prompts;
pub mod report_writer;
pub mod retriever;
pub mod structured_client;
pub mod working_table;

pub use classifier::{ClassifierPolicy, HeuristicClassifier, HeuristicHint};
pub use json_repair::{parse_structured, parse_structured_as, repair, ParseOutcome};
pub use report_writer::{ReportPaths, ReportWriter};
pub use retriever::{DocumentIndex, RetrievedChunk};
pub use structured_client::{Generated, OutputContract, StructuredClient};
