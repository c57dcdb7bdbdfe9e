use crate::error::ErrorReporter;
use crate::model::{OutlineNode, TreeNode};
use egui_tree::{ClickEvent, DefaultController, Tree, TreeController, TreeError};

/// 点击符号行只选中，不改变展开状态；只有展开按钮能展开/折叠符号
pub struct OutlineController {
    inner: DefaultController,
    errors: ErrorReporter,
}

impl OutlineController {
    pub fn new(expand_on_click: bool, errors: ErrorReporter) -> Self {
        Self {
            inner: DefaultController { expand_on_click },
            errors,
        }
    }
}

impl<T> TreeController<OutlineNode, T> for OutlineController {
    fn on_click(
        &self,
        tree: &mut Tree<OutlineNode, T>,
        element: &OutlineNode,
        event: &ClickEvent,
    ) -> Result<bool, TreeError> {
        if event.on_twistie || !matches!(element.kind(), TreeNode::Element(_)) {
            return self.inner.on_click(tree, element, event);
        }

        let was_expanded = tree.is_expanded(element);
        if let Err(err) = self.inner.on_click(tree, element, event) {
            self.errors.report(err);
        }
        if tree.is_expanded(element) != was_expanded {
            if let Err(err) = tree.set_expansion(element, was_expanded) {
                self.errors.report(err);
            }
        }
        Ok(true)
    }
}
