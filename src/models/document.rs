use serde::{Deserialize, Serialize};

/// 文档在审计中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    /// 试卷
    Exam,
    /// 评价文件（评价标准 / 细目表）
    Policy,
    /// 学生用书
    Book,
}

impl DocumentRole {
    pub fn name(self) -> &'static str {
        match self {
            DocumentRole::Exam => "exam",
            DocumentRole::Policy => "policy",
            DocumentRole::Book => "book",
        }
    }
}

impl std::fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 提取后的文档文本，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    role: DocumentRole,
    text: String,
}

impl Document {
    pub fn new(role: DocumentRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    /// 可选文档缺失时使用的空文档
    pub fn empty(role: DocumentRole) -> Self {
        Self::new(role, String::new())
    }

    pub fn role(&self) -> DocumentRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// 闭区间页码范围，从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// 判断页码（从 1 开始）是否在范围内
    pub fn contains(&self, page: u32) -> bool {
        page >= self.start && page <= self.end
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// 文档中的一个片段，`start..end` 为字符位置（非字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }
}
