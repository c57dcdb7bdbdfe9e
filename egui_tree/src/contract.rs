//! 树组件的适配接口
//!
//! 树本身不理解元素的含义，所有与具体数据相关的行为都通过这里的 trait 注入：
//! 数据源负责导航，渲染器负责绘制行，排序器和过滤器决定兄弟节点的顺序与可见性。

use egui::{Rect, Ui};
use futures::future::LocalBoxFuture;
use std::cmp::Ordering;

/// 树的导航适配器
pub trait TreeDataSource<E> {
    /// 节点的稳定标识，用于展开/选择状态
    fn get_id(&self, element: &E) -> String;

    fn has_children(&self, element: &E) -> bool;

    /// 异步获取子节点。返回的 future 不借用数据源，可以在执行器上独立运行。
    fn get_children(&self, element: &E) -> LocalBoxFuture<'static, Vec<E>>;

    fn get_parent(&self, element: &E) -> Option<E>;

    /// 首次加载时是否自动展开
    fn should_autoexpand(&self, _element: &E) -> bool {
        false
    }
}

pub trait TreeSorter<E> {
    fn compare(&self, a: &E, b: &E) -> Ordering;
}

pub trait TreeFilter<E> {
    fn is_visible(&self, element: &E) -> bool;
}

/// 行绘制时的状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowState {
    pub selected: bool,
    pub focused: bool,
    pub hovered: bool,
}

/// 基于模板的行渲染器
///
/// 每个可见行对应一个行槽位，槽位持有一个模板。模板只在模板类型变化时创建，
/// 绑定到不同元素时通过 [`TreeRenderer::render_element`] 重新填充数据，
/// 槽位被回收时通过 [`TreeRenderer::dispose_template`] 释放。
pub trait TreeRenderer<E> {
    type Template;

    fn row_height(&self, element: &E) -> f32;

    fn template_id(&self, element: &E) -> &'static str;

    fn render_template(&self, template_id: &str) -> Self::Template;

    fn render_element(&self, element: &E, template_id: &str, template: &mut Self::Template);

    /// 在 `rect` 内绘制模板内容（不含缩进和展开按钮）
    fn paint(&self, ui: &mut Ui, rect: Rect, template: &Self::Template, state: RowState);

    fn tooltip(&self, _template: &Self::Template) -> Option<String> {
        None
    }

    fn dispose_template(&self, template_id: &str, template: Self::Template);
}
