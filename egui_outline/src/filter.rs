use crate::model::{OutlineNode, TreeNode};
use egui_tree::TreeFilter;

/// 隐藏没有匹配分数的符号，根节点和分组始终可见
#[derive(Clone, Copy, Debug, Default)]
pub struct OutlineItemFilter;

impl TreeFilter<OutlineNode> for OutlineItemFilter {
    fn is_visible(&self, element: &OutlineNode) -> bool {
        match element.kind() {
            TreeNode::Root(_) | TreeNode::Group(_) => true,
            TreeNode::Element(element) => element.score().is_some(),
        }
    }
}
