//! 树状态的保存与恢复
//!
//! 模型刷新后节点对象全部换新，但 id 保持稳定。这里按 id 记录选中、焦点和展开的节点，
//! 在新模型计算完成后再映射回去。

use crate::model::{OutlineNode, TreeNode};
use crate::renderer::OutlineTemplate;
use egui_tree::Tree;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

pub type OutlineTree = Tree<OutlineNode, OutlineTemplate>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineTreeState {
    pub selected: Option<String>,
    pub focused: Option<String>,
    /// 按遍历顺序记录的已展开节点
    pub expanded: Vec<String>,
}

impl OutlineTreeState {
    pub fn capture(tree: &OutlineTree) -> Self {
        let selected = tree.selection().first().map(|node| node.id().to_string());
        let focused = tree.focus().map(|node| node.id().to_string());
        let expanded = tree
            .navigator()
            .filter(|node| tree.has_children(node) && tree.is_expanded(node))
            .map(|node| node.id().to_string())
            .collect();
        Self {
            selected,
            focused,
            expanded,
        }
    }

    /// 等待当前模型计算完成后恢复状态。
    ///
    /// 先折叠全部节点再展开记录中仍然存在的节点，因此重复调用结果相同。
    /// 已经不存在的选中/焦点节点会清空对应状态。
    pub async fn restore(state: Option<Self>, tree: Rc<RefCell<OutlineTree>>) {
        let Some(state) = state else {
            return;
        };
        let Some(input) = tree.borrow().input().cloned() else {
            return;
        };
        if !matches!(input.kind(), TreeNode::Root(_)) {
            return;
        }

        let model = input.model().clone();
        model.request().await;

        let mut tree = tree.borrow_mut();
        if !tree
            .input()
            .is_some_and(|current| Rc::ptr_eq(current.model(), &model))
        {
            log::debug!("Outline input changed while restoring {}", model.uri());
            return;
        }

        let expanded: Vec<OutlineNode> = state
            .expanded
            .iter()
            .filter_map(|id| model.get_item_by_id(id))
            .collect();
        let selected = state.selected.as_deref().and_then(|id| model.get_item_by_id(id));
        let focused = state.focused.as_deref().and_then(|id| model.get_item_by_id(id));

        tree.collapse_all();
        tree.expand_all(&expanded);
        tree.set_selection(selected.into_iter().collect());
        tree.set_focus(focused);
    }
}
