//! 分块与检索服务 - 业务能力层
//!
//! 把参考文档切成有重叠的片段，按词袋重叠度为每道题挑选上下文。
//! 只做字面匹配，不做语义相似度。

use std::collections::HashSet;

use tracing::debug;

use crate::models::{Chunk, Document, DocumentRole};
use crate::services::normalize::normalized_tokens;

/// 将文本切成有重叠的片段
///
/// - 长度以字符计（阿拉伯文按字节切会截断字符）
/// - 相邻片段重叠 `overlap` 个字符；去掉重叠部分后可原样拼回全文
/// - `len(text) <= size` 时只返回一个片段，空文本不产生片段
/// - `size == 0` 按 1 处理，`overlap >= size` 收紧为 `size - 1`
pub fn chunk(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let size = size.max(1);
    let overlap = overlap.min(size - 1);
    let stride = size - overlap;

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + size).min(chars.len());
        chunks.push(Chunk {
            index: chunks.len(),
            start,
            end,
            text: chars[start..end].iter().collect(),
        });

        if end == chars.len() {
            break;
        }
        start += stride;
    }

    chunks
}

/// 查询词在片段中出现的比例
pub fn score(query: &str, chunk: &str) -> f64 {
    let query_tokens = normalized_tokens(query);
    let chunk_tokens = normalized_tokens(chunk);
    score_tokens(&query_tokens, &chunk_tokens)
}

fn score_tokens(query_tokens: &HashSet<String>, chunk_tokens: &HashSet<String>) -> f64 {
    if query_tokens.is_empty() || chunk_tokens.is_empty() {
        return 0.0;
    }
    let shared = query_tokens.intersection(chunk_tokens).count();
    shared as f64 / query_tokens.len() as f64
}

/// 检索命中的片段
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f64,
    /// 是否真的有字面重叠（回退路径为 false）
    pub lexical_match: bool,
}

/// 单个文档的片段缓存
///
/// 一次运行内每个文档只切一次块，所有题目共用。
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    chunks: Vec<Chunk>,
    chunk_tokens: Vec<HashSet<String>>,
}

impl DocumentIndex {
    pub fn build(document: &Document, size: usize, overlap: usize) -> Self {
        let chunks = chunk(document.text(), size, overlap);
        let chunk_tokens = chunks.iter().map(|c| normalized_tokens(&c.text)).collect();
        debug!(
            "文档 {} 切分完成: {} 字符 → {} 个片段",
            document.role(),
            document.char_len(),
            chunks.len()
        );
        Self {
            chunks,
            chunk_tokens,
        }
    }

    /// 取得分最高的至多 `k` 个片段
    ///
    /// 只保留得分 > 0 的片段，同分按文档顺序；全部为 0 时退回文档开头的 `k` 个片段，
    /// 因此非空文档总能给出上下文。
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<RetrievedChunk<'_>> {
        if k == 0 || self.chunks.is_empty() {
            return Vec::new();
        }

        let query_tokens = normalized_tokens(query);
        let mut scored: Vec<RetrievedChunk<'_>> = self
            .chunks
            .iter()
            .zip(&self.chunk_tokens)
            .map(|(chunk, tokens)| RetrievedChunk {
                chunk,
                score: score_tokens(&query_tokens, tokens),
                lexical_match: true,
            })
            .filter(|r| r.score > 0.0)
            .collect();

        if scored.is_empty() {
            return self
                .chunks
                .iter()
                .take(k)
                .map(|chunk| RetrievedChunk {
                    chunk,
                    score: 0.0,
                    lexical_match: false,
                })
                .collect();
        }

        // sort_by 是稳定排序，同分保持文档顺序
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        scored
    }
}

/// 一次性检索（不缓存片段）
pub fn retrieve(query: &str, text: &str, k: usize, size: usize, overlap: usize) -> Vec<Chunk> {
    let document = Document::new(DocumentRole::Book, text);
    let index = DocumentIndex::build(&document, size, overlap);
    index
        .retrieve(query, k)
        .into_iter()
        .map(|r| r.chunk.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(chunks: &[Chunk], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(&c.text);
            } else {
                out.extend(c.text.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn test_single_chunk_when_text_fits() {
        let chunks = chunk("short text", 50, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short text");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 10));
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(chunk("", 10, 2).is_empty());
    }

    #[test]
    fn test_adjacent_chunks_overlap() {
        let chunks = chunk("abcdefghij", 4, 2);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efgh", "ghij"]);
    }

    #[test]
    fn test_chunks_reconstruct_text() {
        let texts = [
            "The quick brown fox jumps over the lazy dog.",
            "احسب السرعة من الرسم البياني المعطى في الشكل رقم ٢ ثم فسر النتيجة",
            "a",
            "0123456789012",
        ];
        for text in texts {
            for (size, overlap) in [(2, 1), (5, 2), (7, 3), (10, 9), (13, 1), (100, 50)] {
                let chunks = chunk(text, size, overlap);
                assert_eq!(reconstruct(&chunks, overlap), text, "size={} overlap={}", size, overlap);
                for pair in chunks.windows(2) {
                    assert_eq!(pair[0].end - pair[1].start, overlap);
                }
            }
        }
    }

    #[test]
    fn test_degenerate_parameters_are_clamped() {
        let chunks = chunk("abc", 0, 5);
        assert_eq!(chunks.len(), 3);
        assert_eq!(reconstruct(&chunks, 0), "abc");
    }

    #[test]
    fn test_score_full_coverage_is_one() {
        assert_eq!(score("Define force", "In physics we define a force as a push"), 1.0);
        assert_eq!(score("Define, FORCE!", "force: define"), 1.0);
    }

    #[test]
    fn test_score_partial_and_empty() {
        assert_eq!(score("define force", "force only"), 0.5);
        assert_eq!(score("", "anything"), 0.0);
        assert_eq!(score("anything", ""), 0.0);
        assert_eq!(score("...", "anything"), 0.0);
    }

    #[test]
    fn test_retrieve_orders_by_score_then_position() {
        let doc = Document::new(DocumentRole::Policy, "aaaa speed bbbb speed time cccc time");
        let index = DocumentIndex::build(&doc, 10, 0);
        let results = index.retrieve("speed time", 3);

        assert!(results.len() <= 3);
        assert!(results.iter().all(|r| r.score > 0.0 && r.lexical_match));
        for pair in results.windows(2) {
            assert!(
                pair[0].score > pair[1].score
                    || (pair[0].score == pair[1].score && pair[0].chunk.index < pair[1].chunk.index)
            );
        }
    }

    #[test]
    fn test_retrieve_falls_back_to_first_chunks() {
        let doc = Document::new(DocumentRole::Book, "one two three four five six seven eight");
        let index = DocumentIndex::build(&doc, 8, 2);
        let results = index.retrieve("momentum", 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.index, 0);
        assert_eq!(results[1].chunk.index, 1);
        assert!(results.iter().all(|r| !r.lexical_match));
    }

    #[test]
    fn test_retrieve_never_empty_for_non_empty_text() {
        for query in ["", "zzz", "two"] {
            let chunks = retrieve(query, "one two three", 3, 4, 1);
            assert!(!chunks.is_empty());
            assert!(chunks.len() <= 3);
        }
        assert!(retrieve("two", "", 3, 4, 1).is_empty());
    }
}
