//! 文本提取 - 基础设施层
//!
//! 把文档字节转换成纯文本。PDF 解析本身由外部服务完成；
//! 本地只处理已经是文本的输入（页之间用换页符 `\x0c` 分隔）。

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::PageRange;

/// 文本提取服务
///
/// 页码范围从 1 开始、两端包含；无法识别的输入（如扫描件）返回空字符串。
pub trait TextExtractor: Send + Sync {
    fn extract(
        &self,
        bytes: &[u8],
        pages: Option<PageRange>,
    ) -> impl Future<Output = AppResult<String>> + Send;
}

/// 本地纯文本提取
#[derive(Debug, Clone, Default)]
pub struct PlainTextExtractor;

const PAGE_BREAK: char = '\x0c';

impl PlainTextExtractor {
    pub fn extract_text(&self, bytes: &[u8], pages: Option<PageRange>) -> String {
        if bytes.starts_with(b"%PDF") {
            warn!("⚠️ 输入是 PDF 二进制，本地无法提取文本（请配置 EXTRACTION_SERVICE_URL）");
            return String::new();
        }

        let text = String::from_utf8_lossy(bytes);
        match pages {
            None => text.replace(PAGE_BREAK, "\n"),
            Some(range) => text
                .split(PAGE_BREAK)
                .enumerate()
                .filter(|(i, _)| range.contains(*i as u32 + 1))
                .map(|(_, page)| page)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8], pages: Option<PageRange>) -> AppResult<String> {
        Ok(self.extract_text(bytes, pages))
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    text: String,
}

/// 远程文本提取服务客户端
///
/// `POST {url}?first_page=&last_page=`，请求体为原始字节，响应 `{"text": "..."}`
#[derive(Debug, Clone)]
pub struct RemoteExtractor {
    client: reqwest::Client,
    url: String,
}

impl RemoteExtractor {
    pub fn new(url: impl Into<String>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(AppError::extraction_failed)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn request(&self, bytes: &[u8], pages: Option<PageRange>) -> AppResult<String> {
        let mut request = self.client.post(&self.url).body(bytes.to_vec());
        if let Some(range) = pages {
            request = request.query(&[("first_page", range.start), ("last_page", range.end)]);
        }

        debug!("调用文本提取服务: {} ({} 字节)", self.url, bytes.len());

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(AppError::extraction_failed)?;

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(AppError::extraction_failed)?;

        Ok(body.text)
    }
}

impl TextExtractor for RemoteExtractor {
    async fn extract(&self, bytes: &[u8], pages: Option<PageRange>) -> AppResult<String> {
        self.request(bytes, pages).await
    }
}

/// 按配置选择的提取方式
#[derive(Debug, Clone)]
pub enum Extractor {
    Plain(PlainTextExtractor),
    Remote(RemoteExtractor),
}

impl Extractor {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        match config.extraction_service_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(Extractor::Remote(RemoteExtractor::new(url)?)),
            _ => Ok(Extractor::Plain(PlainTextExtractor)),
        }
    }
}

impl TextExtractor for Extractor {
    async fn extract(&self, bytes: &[u8], pages: Option<PageRange>) -> AppResult<String> {
        match self {
            Extractor::Plain(e) => e.extract(bytes, pages).await,
            Extractor::Remote(e) => e.extract(bytes, pages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_document_without_range() {
        let text = PlainTextExtractor.extract_text(b"page one\x0cpage two", None);
        assert_eq!(text, "page one\npage two");
    }

    #[test]
    fn test_inclusive_page_range() {
        let bytes = b"p1\x0cp2\x0cp3\x0cp4";
        let text = PlainTextExtractor.extract_text(bytes, Some(PageRange::new(2, 3)));
        assert_eq!(text, "p2\np3");
    }

    #[test]
    fn test_range_past_end_is_empty() {
        let text = PlainTextExtractor.extract_text(b"p1\x0cp2", Some(PageRange::new(5, 9)));
        assert_eq!(text, "");
    }

    #[test]
    fn test_pdf_binary_is_unreadable() {
        let text = PlainTextExtractor.extract_text(b"%PDF-1.7\n%binary", None);
        assert!(text.is_empty());
    }

    #[test]
    fn test_extractor_from_config() {
        let config = Config::default();
        assert!(matches!(Extractor::from_config(&config).unwrap(), Extractor::Plain(_)));

        let config = Config {
            extraction_service_url: Some("http://localhost:9000/extract".to_string()),
            ..Default::default()
        };
        assert!(matches!(Extractor::from_config(&config).unwrap(), Extractor::Remote(_)));
    }

    #[test]
    fn test_async_extract_via_block_on() {
        let extractor = Extractor::Plain(PlainTextExtractor);
        let text = tokio_test::block_on(extractor.extract(b"a\x0cb", Some(PageRange::new(1, 1))))
            .unwrap();
        assert_eq!(text, "a");
    }
}
