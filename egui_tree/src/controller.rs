//! 点击交互控制

use crate::error::TreeError;
use crate::tree::{Tree, TreeEvent};

/// 一次鼠标左键点击
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClickEvent {
    /// 点击是否落在展开/折叠按钮上
    pub on_twistie: bool,
    pub double_click: bool,
}

impl ClickEvent {
    pub fn row() -> Self {
        Self::default()
    }

    pub fn twistie() -> Self {
        Self {
            on_twistie: true,
            double_click: false,
        }
    }

    pub fn double() -> Self {
        Self {
            on_twistie: false,
            double_click: true,
        }
    }
}

pub trait TreeController<E, T> {
    /// 处理行上的左键点击，返回是否已处理
    fn on_click(&self, tree: &mut Tree<E, T>, element: &E, event: &ClickEvent) -> Result<bool, TreeError>;
}

/// 默认控制器：选中并聚焦被点击的行，单击发出点击事件，双击发出激活事件，
/// 点击展开按钮（或开启 `expand_on_click` 时点击整行）切换展开状态。
#[derive(Clone, Debug)]
pub struct DefaultController {
    pub expand_on_click: bool,
}

impl Default for DefaultController {
    fn default() -> Self {
        Self {
            expand_on_click: true,
        }
    }
}

impl<E: Clone + 'static, T> TreeController<E, T> for DefaultController {
    fn on_click(&self, tree: &mut Tree<E, T>, element: &E, event: &ClickEvent) -> Result<bool, TreeError> {
        if !event.on_twistie {
            tree.set_focus(Some(element.clone()));
            tree.set_selection(vec![element.clone()]);
            if event.double_click {
                tree.emit(TreeEvent::Activated(element.clone()));
            } else {
                tree.emit(TreeEvent::Clicked(element.clone()));
            }
        }

        if tree.has_children(element) && (event.on_twistie || self.expand_on_click) {
            tree.toggle_expansion(element)?;
        }

        Ok(true)
    }
}
