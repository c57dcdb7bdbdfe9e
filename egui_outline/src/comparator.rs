//! 兄弟节点排序

use crate::model::{OutlineNode, TreeNode};
use crate::symbol::Range;
use egui_tree::TreeSorter;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::cmp::Ordering;
use unicase::UniCase;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlineItemCompareType {
    #[default]
    ByPosition,
    ByName,
    ByKind,
}

impl OutlineItemCompareType {
    pub const ALL: [OutlineItemCompareType; 3] = [
        OutlineItemCompareType::ByPosition,
        OutlineItemCompareType::ByName,
        OutlineItemCompareType::ByKind,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OutlineItemCompareType::ByPosition => "Sort By: Position",
            OutlineItemCompareType::ByName => "Sort By: Name",
            OutlineItemCompareType::ByKind => "Sort By: Type",
        }
    }
}

/// 分组按注册顺序排列，符号按配置的方式排列，其余组合视为相等
#[derive(Debug, Default)]
pub struct OutlineItemComparator {
    compare_type: Cell<OutlineItemCompareType>,
}

impl OutlineItemComparator {
    pub fn new(compare_type: OutlineItemCompareType) -> Self {
        Self {
            compare_type: Cell::new(compare_type),
        }
    }

    pub fn compare_type(&self) -> OutlineItemCompareType {
        self.compare_type.get()
    }

    /// 修改后需要让树重新排序
    pub fn set_compare_type(&self, compare_type: OutlineItemCompareType) {
        self.compare_type.set(compare_type);
    }
}

impl TreeSorter<OutlineNode> for OutlineItemComparator {
    fn compare(&self, a: &OutlineNode, b: &OutlineNode) -> Ordering {
        match (a.kind(), b.kind()) {
            (TreeNode::Group(a), TreeNode::Group(b)) => a.provider().index.cmp(&b.provider().index),
            (TreeNode::Element(a), TreeNode::Element(b)) => {
                let (a, b) = (a.symbol(), b.symbol());
                match self.compare_type.get() {
                    OutlineItemCompareType::ByKind => a.kind.code().cmp(&b.kind.code()),
                    OutlineItemCompareType::ByName => compare_symbol_names(&a.name, &b.name),
                    OutlineItemCompareType::ByPosition => Range::compare_using_starts(&a.range, &b.range),
                }
            }
            _ => Ordering::Equal,
        }
    }
}

/// 忽略大小写比较，仅大小写不同时小写在前
pub fn compare_symbol_names(a: &str, b: &str) -> Ordering {
    UniCase::new(a)
        .cmp(&UniCase::new(b))
        .then_with(|| b.cmp(a))
}
