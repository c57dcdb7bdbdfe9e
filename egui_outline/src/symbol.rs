//! 符号数据结构
//!
//! 描述大纲中单个符号的名称、类型与源码位置。

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use url::Url;

/// 源码位置，行号和列号都从 1 开始
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line_number: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line_number: u32, column: u32) -> Self {
        Self { line_number, column }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start: Position::new(start_line, start_column),
            end: Position::new(end_line, end_column),
        }
    }

    /// 先比较起点，起点相同时结束得早的在前
    pub fn compare_using_starts(a: &Range, b: &Range) -> Ordering {
        a.start.cmp(&b.start).then_with(|| a.end.cmp(&b.end))
    }

    pub fn contains_position(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }
}

/// 符号类型，数值与编辑器协议中的编号一致
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum SymbolKind {
    File = 0,
    Module = 1,
    Namespace = 2,
    Package = 3,
    Class = 4,
    Method = 5,
    Property = 6,
    Field = 7,
    Constructor = 8,
    Enum = 9,
    Interface = 10,
    Function = 11,
    Variable = 12,
    Constant = 13,
    String = 14,
    Number = 15,
    Boolean = 16,
    Array = 17,
    Object = 18,
    Key = 19,
    Null = 20,
    EnumMember = 21,
    Struct = 22,
    Event = 23,
    Operator = 24,
    TypeParameter = 25,
}

impl SymbolKind {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn css_class(self) -> &'static str {
        match self {
            SymbolKind::File => "file",
            SymbolKind::Module => "module",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Package => "package",
            SymbolKind::Class => "class",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Enum => "enum",
            SymbolKind::Interface => "interface",
            SymbolKind::Function => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Constant => "constant",
            SymbolKind::String => "string",
            SymbolKind::Number => "number",
            SymbolKind::Boolean => "boolean",
            SymbolKind::Array => "array",
            SymbolKind::Object => "object",
            SymbolKind::Key => "key",
            SymbolKind::Null => "null",
            SymbolKind::EnumMember => "enum-member",
            SymbolKind::Struct => "struct",
            SymbolKind::Event => "event",
            SymbolKind::Operator => "operator",
            SymbolKind::TypeParameter => "type-parameter",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInformation {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    pub uri: Url,
    pub range: Range,
}

impl SymbolInformation {
    pub fn new(name: impl Into<String>, kind: SymbolKind, uri: Url, range: Range) -> Self {
        Self {
            name: name.into(),
            kind,
            container_name: None,
            uri,
            range,
        }
    }
}

/// 模糊匹配结果：分数和命中的字符下标
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyScore {
    pub score: i32,
    pub matches: Vec<usize>,
}

impl FuzzyScore {
    /// 没有过滤条件时所有符号都带这个分数
    pub const NEUTRAL: i32 = -100;

    pub fn new(score: i32, matches: Vec<usize>) -> Self {
        Self { score, matches }
    }

    pub fn neutral() -> Self {
        Self::new(Self::NEUTRAL, Vec::new())
    }
}
