//! 树组件实现

use crate::contract::{RowState, TreeDataSource, TreeFilter, TreeRenderer, TreeSorter};
use crate::controller::{ClickEvent, DefaultController, TreeController};
use crate::error::TreeError;
use crossbeam_channel::{Receiver, Sender};
use egui::*;
use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

/// 树事件
#[derive(Debug, Clone)]
pub enum TreeEvent<E> {
    SelectionChanged(Vec<E>),
    FocusChanged(Option<E>),
    /// 行被单击（不含展开按钮）
    Clicked(E),
    /// 行被双击
    Activated(E),
    ExpansionChanged { element: E, expanded: bool },
}

/// 注入树的适配器集合
pub struct TreeConfiguration<E, T> {
    pub data_source: Rc<dyn TreeDataSource<E>>,
    pub renderer: Rc<dyn TreeRenderer<E, Template = T>>,
    /// 为空时使用 [`DefaultController`]
    pub controller: Option<Rc<dyn TreeController<E, T>>>,
    pub sorter: Option<Rc<dyn TreeSorter<E>>>,
    pub filter: Option<Rc<dyn TreeFilter<E>>>,
}

#[derive(Clone, Debug)]
pub struct TreeOptions {
    /// 每一级的缩进宽度
    pub indent: f32,
    pub twistie_width: f32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            indent: 12.0,
            twistie_width: 16.0,
        }
    }
}

enum Children {
    NotLoaded,
    Loading,
    Loaded(Vec<String>),
}

struct NodeEntry<E> {
    element: E,
    has_children: bool,
    autoexpand: bool,
    children: Children,
}

struct LoadedChildren<E> {
    generation: u64,
    parent: String,
    children: Vec<E>,
}

struct RowSlot<T> {
    template_id: &'static str,
    template: T,
    bound: Option<String>,
    rendered: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct VisibleRow {
    id: String,
    depth: usize,
}

/// 通用的虚拟化树组件
///
/// 节点按数据源给出的 id 管理。展开状态独立于已加载的节点保存，
/// 因此可以在子节点加载完成之前就展开某个 id。
pub struct Tree<E, T> {
    data_source: Rc<dyn TreeDataSource<E>>,
    renderer: Rc<dyn TreeRenderer<E, Template = T>>,
    controller: Rc<dyn TreeController<E, T>>,
    sorter: Option<Rc<dyn TreeSorter<E>>>,
    filter: Option<Rc<dyn TreeFilter<E>>>,
    options: TreeOptions,
    spawner: LocalSpawner,

    input: Option<E>,
    root_id: Option<String>,
    nodes: HashMap<String, NodeEntry<E>>,
    /// 显式的展开/折叠状态，优先于自动展开
    expansion: HashMap<String, bool>,
    autoexpand_enabled: bool,
    selection: Vec<E>,
    focus: Option<E>,
    reveal_request: Option<String>,

    // 每次 set_input 递增，旧输入的加载结果据此丢弃
    generation: u64,
    render_generation: u64,
    loads_tx: Sender<LoadedChildren<E>>,
    loads_rx: Receiver<LoadedChildren<E>>,

    slots: Vec<RowSlot<T>>,
    pending_events: Vec<TreeEvent<E>>,
}

impl<E: Clone + 'static, T> Tree<E, T> {
    pub fn new(configuration: TreeConfiguration<E, T>, options: TreeOptions, spawner: LocalSpawner) -> Self {
        let (loads_tx, loads_rx) = crossbeam_channel::unbounded();
        let controller = configuration
            .controller
            .unwrap_or_else(|| Rc::new(DefaultController::default()));
        Self {
            data_source: configuration.data_source,
            renderer: configuration.renderer,
            controller,
            sorter: configuration.sorter,
            filter: configuration.filter,
            options,
            spawner,
            input: None,
            root_id: None,
            nodes: HashMap::new(),
            expansion: HashMap::new(),
            autoexpand_enabled: true,
            selection: Vec::new(),
            focus: None,
            reveal_request: None,
            generation: 0,
            render_generation: 0,
            loads_tx,
            loads_rx,
            slots: Vec::new(),
            pending_events: Vec::new(),
        }
    }

    /// 设置新的根元素。之前的节点、展开、选择和焦点状态全部丢弃。
    pub fn set_input(&mut self, input: E) {
        self.reset();
        let id = self.data_source.get_id(&input);
        self.nodes.insert(
            id.clone(),
            NodeEntry {
                element: input.clone(),
                has_children: self.data_source.has_children(&input),
                autoexpand: true,
                children: Children::NotLoaded,
            },
        );
        self.root_id = Some(id.clone());
        self.input = Some(input);

        if let Err(err) = self.load_children(&id) {
            log::warn!("Failed to load tree root {}: {}", id, err);
        }
    }

    pub fn clear_input(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.nodes.clear();
        self.expansion.clear();
        self.autoexpand_enabled = true;
        self.selection.clear();
        self.focus = None;
        self.reveal_request = None;
        self.root_id = None;
        self.input = None;
        self.refresh();
    }

    pub fn input(&self) -> Option<&E> {
        self.input.as_ref()
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: TreeOptions) {
        self.options = options;
    }

    // ------------------------------------------------------------------
    // 加载
    // ------------------------------------------------------------------

    fn load_children(&mut self, id: &str) -> Result<(), TreeError> {
        let entry = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| TreeError::ElementNotFound(id.to_string()))?;
        if !matches!(entry.children, Children::NotLoaded) {
            return Ok(());
        }
        entry.children = Children::Loading;
        let children = self.data_source.get_children(&entry.element);

        let sender = self.loads_tx.clone();
        let generation = self.generation;
        let parent = id.to_string();
        let spawned = self.spawner.spawn_local(async move {
            let children = children.await;
            // 树已销毁时接收端不存在，结果直接丢弃
            let _ = sender.send(LoadedChildren {
                generation,
                parent,
                children,
            });
        });

        if let Err(err) = spawned {
            if let Some(entry) = self.nodes.get_mut(id) {
                entry.children = Children::NotLoaded;
            }
            return Err(err.into());
        }
        log::debug!("Loading children of {}", id);
        Ok(())
    }

    /// 应用已完成的子节点加载，并为新出现的已展开行发起加载。
    /// 宿主每帧调用（`ui` 会自动调用），返回是否还有工作在进行。
    pub fn process_pending(&mut self) -> bool {
        let loads: Vec<_> = self.loads_rx.try_iter().collect();
        let mut changed = false;
        for load in loads {
            if load.generation != self.generation {
                log::debug!("Dropping stale children of {}", load.parent);
                continue;
            }
            self.apply_children(load.parent, load.children);
            changed = true;
        }
        if changed {
            self.refresh();
        }
        let spawned = self.load_expanded();
        changed || spawned
    }

    fn apply_children(&mut self, parent: String, mut children: Vec<E>) {
        if !self.nodes.contains_key(&parent) {
            return;
        }
        if let Some(sorter) = &self.sorter {
            children.sort_by(|a, b| sorter.compare(a, b));
        }

        let mut ids = Vec::with_capacity(children.len());
        for child in children {
            let id = self.data_source.get_id(&child);
            let entry = NodeEntry {
                has_children: self.data_source.has_children(&child),
                autoexpand: self.data_source.should_autoexpand(&child),
                element: child,
                children: Children::NotLoaded,
            };
            self.nodes.insert(id.clone(), entry);
            ids.push(id);
        }

        if let Some(entry) = self.nodes.get_mut(&parent) {
            entry.children = Children::Loaded(ids);
        }
    }

    /// 为所有可见且已展开、但尚未加载子节点的行发起加载
    fn load_expanded(&mut self) -> bool {
        let pending: Vec<String> = self
            .visible_rows()
            .into_iter()
            .filter(|row| {
                self.nodes.get(&row.id).is_some_and(|entry| {
                    entry.has_children && matches!(entry.children, Children::NotLoaded)
                }) && self.is_expanded_id(&row.id)
            })
            .map(|row| row.id)
            .collect();

        let mut spawned = false;
        for id in pending {
            match self.load_children(&id) {
                Ok(()) => spawned = true,
                Err(err) => log::warn!("Failed to load children of {}: {}", id, err),
            }
        }
        spawned
    }

    // ------------------------------------------------------------------
    // 排序与刷新
    // ------------------------------------------------------------------

    /// 使所有行在下一帧重新渲染
    pub fn refresh(&mut self) {
        self.render_generation += 1;
    }

    pub fn set_sorter(&mut self, sorter: Option<Rc<dyn TreeSorter<E>>>) {
        self.sorter = sorter;
        self.resort();
    }

    /// 用当前排序器重新排列所有已加载的子节点
    pub fn resort(&mut self) {
        let Some(sorter) = self.sorter.clone() else {
            return;
        };

        let parents: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, entry)| matches!(entry.children, Children::Loaded(_)))
            .map(|(id, _)| id.clone())
            .collect();

        for parent in parents {
            let mut ids = match self.nodes.get(&parent).map(|entry| &entry.children) {
                Some(Children::Loaded(ids)) => ids.clone(),
                _ => continue,
            };
            ids.sort_by(|a, b| match (self.nodes.get(a), self.nodes.get(b)) {
                (Some(a), Some(b)) => sorter.compare(&a.element, &b.element),
                _ => Ordering::Equal,
            });
            if let Some(entry) = self.nodes.get_mut(&parent) {
                entry.children = Children::Loaded(ids);
            }
        }
        self.refresh();
    }

    // ------------------------------------------------------------------
    // 展开状态
    // ------------------------------------------------------------------

    pub fn has_children(&self, element: &E) -> bool {
        let id = self.data_source.get_id(element);
        match self.nodes.get(&id) {
            Some(entry) => entry.has_children,
            None => self.data_source.has_children(element),
        }
    }

    pub fn is_expanded(&self, element: &E) -> bool {
        let id = self.data_source.get_id(element);
        self.is_expanded_id(&id)
    }

    fn is_expanded_id(&self, id: &str) -> bool {
        if self.root_id.as_deref() == Some(id) {
            return true;
        }
        if let Some(&expanded) = self.expansion.get(id) {
            return expanded;
        }
        self.autoexpand_enabled
            && self
                .nodes
                .get(id)
                .is_some_and(|entry| entry.autoexpand && entry.has_children)
    }

    fn set_expanded_id(&mut self, element: &E, id: String, expanded: bool) -> bool {
        let was_expanded = self.is_expanded_id(&id);
        self.expansion.insert(id.clone(), expanded);
        if was_expanded == expanded {
            return false;
        }

        if expanded && self.nodes.contains_key(&id) {
            if let Err(err) = self.load_children(&id) {
                log::warn!("Failed to load children of {}: {}", id, err);
            }
        }
        self.pending_events.push(TreeEvent::ExpansionChanged {
            element: element.clone(),
            expanded,
        });
        true
    }

    /// 展开元素，返回状态是否改变。元素可以尚未加载。
    pub fn expand(&mut self, element: &E) -> bool {
        let id = self.data_source.get_id(element);
        self.set_expanded_id(element, id, true)
    }

    pub fn collapse(&mut self, element: &E) -> bool {
        let id = self.data_source.get_id(element);
        self.set_expanded_id(element, id, false)
    }

    pub fn expand_all(&mut self, elements: &[E]) {
        for element in elements {
            self.expand(element);
        }
    }

    /// 折叠全部节点，并在下一次 `set_input` 之前停止自动展开
    pub fn collapse_all(&mut self) {
        self.expansion.clear();
        self.autoexpand_enabled = false;
    }

    /// 切换已加载元素的展开状态，返回新的状态
    pub fn toggle_expansion(&mut self, element: &E) -> Result<bool, TreeError> {
        let id = self.data_source.get_id(element);
        let entry = self
            .nodes
            .get(&id)
            .ok_or_else(|| TreeError::ElementNotFound(id.clone()))?;
        if !entry.has_children {
            return Err(TreeError::NotExpandable(id));
        }
        let expanded = !self.is_expanded_id(&id);
        self.set_expanded_id(element, id, expanded);
        Ok(expanded)
    }

    /// 设置已加载元素的展开状态
    pub fn set_expansion(&mut self, element: &E, expanded: bool) -> Result<(), TreeError> {
        let id = self.data_source.get_id(element);
        if !self.nodes.contains_key(&id) {
            return Err(TreeError::ElementNotFound(id));
        }
        self.set_expanded_id(element, id, expanded);
        Ok(())
    }

    /// 展开元素的所有祖先并在下一帧滚动到该行
    pub fn reveal(&mut self, element: &E) {
        let mut parent = self.data_source.get_parent(element);
        while let Some(ancestor) = parent {
            let id = self.data_source.get_id(&ancestor);
            if self.root_id.as_deref() != Some(id.as_str()) {
                self.expand(&ancestor);
            }
            parent = self.data_source.get_parent(&ancestor);
        }
        self.reveal_request = Some(self.data_source.get_id(element));
    }

    // ------------------------------------------------------------------
    // 选择与焦点
    // ------------------------------------------------------------------

    pub fn selection(&self) -> &[E] {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Vec<E>) {
        self.selection = selection;
        self.pending_events
            .push(TreeEvent::SelectionChanged(self.selection.clone()));
    }

    pub fn focus(&self) -> Option<&E> {
        self.focus.as_ref()
    }

    pub fn set_focus(&mut self, focus: Option<E>) {
        self.focus = focus;
        self.pending_events
            .push(TreeEvent::FocusChanged(self.focus.clone()));
    }

    fn is_selected_id(&self, id: &str) -> bool {
        self.selection
            .iter()
            .any(|element| self.data_source.get_id(element) == id)
    }

    fn is_focused_id(&self, id: &str) -> bool {
        self.focus
            .as_ref()
            .is_some_and(|element| self.data_source.get_id(element) == id)
    }

    // ------------------------------------------------------------------
    // 遍历
    // ------------------------------------------------------------------

    /// 深度优先遍历所有可见行（不含根元素本身）
    pub fn navigator(&self) -> impl Iterator<Item = &E> + '_ {
        self.visible_rows()
            .into_iter()
            .filter_map(move |row| self.nodes.get(&row.id).map(|entry| &entry.element))
    }

    fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        if let Some(root) = &self.root_id {
            self.collect_rows(root, 0, &mut rows);
        }
        rows
    }

    fn collect_rows(&self, parent: &str, depth: usize, rows: &mut Vec<VisibleRow>) {
        let Some(entry) = self.nodes.get(parent) else {
            return;
        };
        let Children::Loaded(children) = &entry.children else {
            return;
        };

        for id in children {
            let Some(child) = self.nodes.get(id) else {
                continue;
            };
            if let Some(filter) = &self.filter {
                if !filter.is_visible(&child.element) {
                    continue;
                }
            }
            rows.push(VisibleRow {
                id: id.clone(),
                depth,
            });
            if child.has_children && self.is_expanded_id(id) {
                self.collect_rows(id, depth + 1, rows);
            }
        }
    }

    // ------------------------------------------------------------------
    // 交互与事件
    // ------------------------------------------------------------------

    /// 将一次点击交给控制器处理
    pub fn handle_click(&mut self, element: &E, event: ClickEvent) -> Result<bool, TreeError> {
        let controller = self.controller.clone();
        controller.on_click(self, element, &event)
    }

    pub(crate) fn emit(&mut self, event: TreeEvent<E>) {
        self.pending_events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<TreeEvent<E>> {
        std::mem::take(&mut self.pending_events)
    }

    // ------------------------------------------------------------------
    // 绘制
    // ------------------------------------------------------------------

    /// 渲染UI
    pub fn ui(&mut self, ui: &mut Ui) {
        if self.process_pending() {
            ui.ctx().request_repaint();
        }

        let Some(input) = self.input.clone() else {
            self.release_slots(0);
            return;
        };
        let rows = self.visible_rows();
        // show_rows 要求等高行
        let row_height = self.renderer.row_height(&input);

        let mut scroll_area = ScrollArea::vertical().auto_shrink([false, false]);
        if let Some(target) = self.reveal_request.take() {
            match rows.iter().position(|row| row.id == target) {
                Some(index) => {
                    scroll_area = scroll_area.vertical_scroll_offset(index as f32 * row_height);
                }
                // 祖先的子节点还在加载
                None => self.reveal_request = Some(target),
            }
        }

        let mut clicked = None;
        let mut used_slots = 0;
        scroll_area.show_rows(ui, row_height, rows.len(), |ui, range| {
            ui.spacing_mut().item_spacing.y = 0.0;
            used_slots = range.len();
            for (slot, row) in rows[range].iter().enumerate() {
                if let Some(click) = self.row_ui(ui, slot, row, row_height) {
                    clicked = Some(click);
                }
            }
        });
        self.release_slots(used_slots);

        if let Some((element, event)) = clicked {
            if let Err(err) = self.handle_click(&element, event) {
                log::warn!("Tree click failed: {}", err);
            }
            ui.ctx().request_repaint();
        }
    }

    fn row_ui(&mut self, ui: &mut Ui, slot: usize, row: &VisibleRow, row_height: f32) -> Option<(E, ClickEvent)> {
        let entry = self.nodes.get(&row.id)?;
        let element = entry.element.clone();
        let has_children = entry.has_children;
        let expanded = has_children && self.is_expanded_id(&row.id);
        let selected = self.is_selected_id(&row.id);
        let focused = self.is_focused_id(&row.id);

        self.bind_slot(slot, &row.id, &element);

        let (rect, response) =
            ui.allocate_exact_size(vec2(ui.available_width(), row_height), Sense::click());
        let state = RowState {
            selected,
            focused,
            hovered: response.hovered(),
        };

        if state.selected {
            ui.painter()
                .rect_filled(rect, 0.0, ui.visuals().selection.bg_fill);
        } else if state.hovered {
            ui.painter()
                .rect_filled(rect, 0.0, ui.visuals().widgets.hovered.weak_bg_fill);
        }
        if state.focused {
            ui.painter()
                .rect_stroke(rect.shrink(0.5), 0.0, ui.visuals().selection.stroke);
        }

        // 缩进 + 展开按钮
        let indent = row.depth as f32 * self.options.indent;
        let twistie_rect = Rect::from_min_size(
            pos2(rect.left() + indent, rect.top()),
            vec2(self.options.twistie_width, row_height),
        );
        if has_children {
            let icon = if expanded { "▼" } else { "▶" };
            ui.painter().text(
                twistie_rect.center(),
                Align2::CENTER_CENTER,
                icon,
                FontId::proportional(10.0),
                ui.visuals().text_color(),
            );
        }

        let content_rect = Rect::from_min_max(pos2(twistie_rect.right(), rect.top()), rect.max);
        let template = &self.slots[slot].template;
        self.renderer.paint(ui, content_rect, template, state);

        let response = match self.renderer.tooltip(template) {
            Some(text) => response.on_hover_text(text),
            None => response,
        };

        if response.clicked() || response.double_clicked() {
            let on_twistie = has_children
                && response
                    .interact_pointer_pos()
                    .is_some_and(|pos| twistie_rect.contains(pos));
            return Some((
                element,
                ClickEvent {
                    on_twistie,
                    double_click: response.double_clicked(),
                },
            ));
        }
        None
    }

    /// 确保槽位持有正确类型的模板，并在绑定变化或刷新后重新渲染
    fn bind_slot(&mut self, slot: usize, id: &str, element: &E) {
        let template_id = self.renderer.template_id(element);

        if slot >= self.slots.len() {
            self.slots.push(RowSlot {
                template_id,
                template: self.renderer.render_template(template_id),
                bound: None,
                rendered: 0,
            });
        } else if self.slots[slot].template_id != template_id {
            let fresh = RowSlot {
                template_id,
                template: self.renderer.render_template(template_id),
                bound: None,
                rendered: 0,
            };
            let old = std::mem::replace(&mut self.slots[slot], fresh);
            self.renderer.dispose_template(old.template_id, old.template);
        }

        let row = &mut self.slots[slot];
        if row.bound.as_deref() != Some(id) || row.rendered != self.render_generation {
            self.renderer
                .render_element(element, template_id, &mut row.template);
            row.bound = Some(id.to_string());
            row.rendered = self.render_generation;
        }
    }

    fn release_slots(&mut self, keep: usize) {
        if keep >= self.slots.len() {
            return;
        }
        for slot in self.slots.drain(keep..) {
            self.renderer.dispose_template(slot.template_id, slot.template);
        }
    }
}

impl<E, T> Drop for Tree<E, T> {
    fn drop(&mut self) {
        for slot in self.slots.drain(..) {
            self.renderer.dispose_template(slot.template_id, slot.template);
        }
    }
}
