//! 大纲面板
//!
//! 把比较器、过滤器、数据源、渲染器和点击控制器装配到树组件上，
//! 并按文档 URI 保存每个文档的视图状态，切换或刷新模型时自动恢复。

use crate::comparator::{OutlineItemComparator, OutlineItemCompareType};
use crate::config::OutlineConfig;
use crate::controller::OutlineController;
use crate::data_source::OutlineDataSource;
use crate::error::ErrorReporter;
use crate::extensions::ExtensionRegistry;
use crate::filter::OutlineItemFilter;
use crate::model::{OutlineModel, OutlineNode, TreeNode};
use crate::path_label::PathLabelProvider;
use crate::renderer::{OutlineRenderer, OutlineTemplate};
use crate::state::{OutlineTree, OutlineTreeState};
use crate::symbol::{Position, Range};
use egui::*;
use egui_tree::{
    TreeConfiguration, TreeController, TreeError, TreeEvent, TreeFilter, TreeOptions, TreeSorter,
};
use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use url::Url;

/// 最多保留多少个文档的视图状态
pub const MAX_VIEW_STATES: usize = 32;

/// 面板依赖的外部服务
#[derive(Clone)]
pub struct OutlineServices {
    pub extensions: Rc<dyn ExtensionRegistry>,
    pub path_labels: Rc<dyn PathLabelProvider>,
    pub errors: ErrorReporter,
}

/// 面板事件
#[derive(Clone, Debug, PartialEq)]
pub enum OutlinePanelEvent {
    /// 单击符号：在编辑器中显示该符号，不抢占焦点
    RevealSymbol {
        uri: Url,
        range: Range,
        preserve_focus: bool,
    },
    /// 双击符号：打开并聚焦
    OpenSymbol { uri: Url, range: Range },
    SortOrderChanged(OutlineItemCompareType),
}

/// 用大纲适配器创建树组件
pub fn create_outline_tree(
    services: &OutlineServices,
    comparator: Rc<OutlineItemComparator>,
    config: &OutlineConfig,
    spawner: LocalSpawner,
) -> OutlineTree {
    let renderer = OutlineRenderer::new(
        services.extensions.clone(),
        services.path_labels.clone(),
        spawner.clone(),
    );
    let controller = OutlineController::new(config.expand_on_click, services.errors.clone());
    let configuration = TreeConfiguration {
        data_source: Rc::new(OutlineDataSource),
        renderer: Rc::new(renderer),
        controller: Some(Rc::new(controller) as Rc<dyn TreeController<OutlineNode, OutlineTemplate>>),
        sorter: Some(comparator as Rc<dyn TreeSorter<OutlineNode>>),
        filter: Some(Rc::new(OutlineItemFilter) as Rc<dyn TreeFilter<OutlineNode>>),
    };
    let options = TreeOptions {
        indent: config.indent,
        ..TreeOptions::default()
    };
    OutlineTree::new(configuration, options, spawner)
}

pub struct OutlinePanel {
    tree: Rc<RefCell<OutlineTree>>,
    comparator: Rc<OutlineItemComparator>,
    config: OutlineConfig,
    /// 为空时修改配置不写入磁盘
    config_path: Option<PathBuf>,
    spawner: LocalSpawner,
    errors: ErrorReporter,
    /// 按最近使用排序，最旧的在最前
    view_states: IndexMap<Url, OutlineTreeState>,
    pending_events: Vec<OutlinePanelEvent>,
}

impl OutlinePanel {
    pub fn new(services: OutlineServices, config: OutlineConfig, spawner: LocalSpawner) -> Self {
        let comparator = Rc::new(OutlineItemComparator::new(config.sort_order));
        let tree = create_outline_tree(&services, comparator.clone(), &config, spawner.clone());
        Self {
            tree: Rc::new(RefCell::new(tree)),
            comparator,
            config,
            config_path: None,
            spawner,
            errors: services.errors,
            view_states: IndexMap::new(),
            pending_events: Vec::new(),
        }
    }

    pub fn with_config_path(mut self, config_path: Option<PathBuf>) -> Self {
        self.config_path = config_path;
        self
    }

    pub fn tree(&self) -> &Rc<RefCell<OutlineTree>> {
        &self.tree
    }

    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }

    pub fn model(&self) -> Option<Rc<OutlineModel>> {
        self.tree.borrow().input().map(|root| root.model().clone())
    }

    pub fn view_state(&self, uri: &Url) -> Option<&OutlineTreeState> {
        self.view_states.get(uri)
    }

    /// 显示新的模型。当前文档的视图状态先保存下来，
    /// 新模型对应的文档如有保存过的状态则在模型计算完成后恢复。
    pub fn set_model(&mut self, model: Rc<OutlineModel>) {
        self.save_view_state();
        let state = self.view_states.get(model.uri()).cloned();
        self.trim_view_states();
        log::debug!("Showing outline of {}", model.uri());

        self.tree.borrow_mut().set_input(model.root());
        let restore = OutlineTreeState::restore(state, self.tree.clone());
        if let Err(err) = self.spawner.spawn_local(restore) {
            self.errors.report(TreeError::from(err));
        }
    }

    pub fn clear(&mut self) {
        self.save_view_state();
        self.trim_view_states();
        self.tree.borrow_mut().clear_input();
    }

    fn save_view_state(&mut self) {
        let tree = self.tree.borrow();
        let Some(root) = tree.input() else {
            return;
        };
        // 还没加载出任何行时不覆盖之前保存的状态
        if tree.navigator().next().is_none() {
            return;
        }
        // 过滤隐藏的行不在导航器中，记录下来会丢掉它们的展开状态
        if root.model().is_filtered() {
            return;
        }
        let uri = root.model().uri().clone();
        let state = OutlineTreeState::capture(&tree);
        self.view_states.shift_remove(&uri);
        self.view_states.insert(uri, state);
    }

    fn trim_view_states(&mut self) {
        while self.view_states.len() > MAX_VIEW_STATES {
            self.view_states.shift_remove_index(0);
        }
    }

    pub fn set_sort_order(&mut self, sort_order: OutlineItemCompareType) {
        if self.comparator.compare_type() == sort_order {
            return;
        }
        self.comparator.set_compare_type(sort_order);
        self.tree.borrow_mut().resort();

        self.config.sort_order = sort_order;
        self.save_config();
        self.pending_events
            .push(OutlinePanelEvent::SortOrderChanged(sort_order));
    }

    fn save_config(&self) {
        let Some(path) = &self.config_path else {
            return;
        };
        if let Err(err) = self.config.save_to_path(path) {
            self.errors.report(err);
        }
    }

    /// 选中并显示包含光标位置的最深层符号，返回是否找到
    pub fn reveal_position(&mut self, position: Position) -> bool {
        let Some(model) = self.model() else {
            return false;
        };
        let Some(node) = model.get_item_enclosing_position(position) else {
            return false;
        };

        let mut tree = self.tree.borrow_mut();
        tree.reveal(&node);
        tree.set_selection(vec![node.clone()]);
        tree.set_focus(Some(node));
        true
    }

    pub fn collapse_all(&mut self) {
        let mut tree = self.tree.borrow_mut();
        tree.collapse_all();
        tree.refresh();
    }

    /// 渲染UI
    pub fn ui(&mut self, ui: &mut Ui) {
        let mut sort_order = self.comparator.compare_type();
        ui.horizontal(|ui| {
            ComboBox::from_id_salt("outline_sort_order")
                .selected_text(sort_order.label())
                .show_ui(ui, |ui| {
                    for option in OutlineItemCompareType::ALL {
                        ui.selectable_value(&mut sort_order, option, option.label());
                    }
                });
            if ui.button("Collapse All").clicked() {
                self.collapse_all();
            }
        });
        if sort_order != self.comparator.compare_type() {
            self.set_sort_order(sort_order);
        }
        ui.separator();

        self.tree.borrow_mut().ui(ui);
    }

    pub fn take_events(&mut self) -> Vec<OutlinePanelEvent> {
        self.collect_tree_events();
        std::mem::take(&mut self.pending_events)
    }

    fn collect_tree_events(&mut self) {
        let events = self.tree.borrow_mut().take_events();
        for event in events {
            let mapped = match event {
                TreeEvent::Clicked(node) => symbol_location(&node).map(|(uri, range)| {
                    OutlinePanelEvent::RevealSymbol {
                        uri,
                        range,
                        preserve_focus: true,
                    }
                }),
                TreeEvent::Activated(node) => symbol_location(&node)
                    .map(|(uri, range)| OutlinePanelEvent::OpenSymbol { uri, range }),
                _ => None,
            };
            self.pending_events.extend(mapped);
        }
    }
}

fn symbol_location(node: &OutlineNode) -> Option<(Url, Range)> {
    match node.kind() {
        TreeNode::Element(element) => {
            let symbol = element.symbol();
            Some((symbol.uri.clone(), symbol.range))
        }
        TreeNode::Root(_) | TreeNode::Group(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::StaticExtensionRegistry;
    use crate::path_label::WorkspacePathLabels;
    use crate::snapshot::OutlineSnapshot;
    use egui_tree::ClickEvent;
    use futures::executor::LocalPool;
    use pretty_assertions::assert_eq;

    fn snapshot(uri: &str) -> OutlineSnapshot {
        OutlineSnapshot::from_json(&format!(
            r#"{{
                "uri": "{}",
                "groups": [{{
                    "extension_id": "vscode.typescript-language-features",
                    "symbols": [
                        {{
                            "name": "Widget",
                            "kind": "class",
                            "range": {{ "start": {{ "line_number": 1, "column": 1 }}, "end": {{ "line_number": 20, "column": 2 }} }},
                            "children": [{{
                                "name": "render",
                                "kind": "method",
                                "range": {{ "start": {{ "line_number": 4, "column": 5 }}, "end": {{ "line_number": 9, "column": 6 }} }},
                                "children": [{{
                                    "name": "frame",
                                    "kind": "variable",
                                    "range": {{ "start": {{ "line_number": 5, "column": 9 }}, "end": {{ "line_number": 5, "column": 30 }} }}
                                }}]
                            }}]
                        }},
                        {{
                            "name": "createWidget",
                            "kind": "function",
                            "range": {{ "start": {{ "line_number": 22, "column": 1 }}, "end": {{ "line_number": 24, "column": 2 }} }}
                        }}
                    ]
                }}]
            }}"#,
            uri
        ))
        .unwrap()
    }

    fn panel(pool: &LocalPool) -> (OutlinePanel, crossbeam_channel::Receiver<crate::error::OutlineError>) {
        let (errors, receiver) = ErrorReporter::channel();
        let services = OutlineServices {
            extensions: Rc::new(StaticExtensionRegistry::default()),
            path_labels: Rc::new(WorkspacePathLabels::default()),
            errors,
        };
        (OutlinePanel::new(services, OutlineConfig::default(), pool.spawner()), receiver)
    }

    fn settle(pool: &mut LocalPool, panel: &OutlinePanel) {
        crate::test_support::settle(pool, panel.tree());
    }

    fn visible(panel: &OutlinePanel) -> Vec<String> {
        panel
            .tree()
            .borrow()
            .navigator()
            .map(|node| node.id().to_string())
            .collect()
    }

    #[test]
    fn test_view_state_follows_document() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        let first = snapshot("file:///work/widget.ts");
        let second = snapshot("file:///work/other.ts");

        panel.set_model(first.build());
        settle(&mut pool, &panel);
        let model = panel.model().unwrap();
        let widget = model.get_item_by_id("root/0/Widget").unwrap();
        panel.tree().borrow_mut().collapse(&widget);
        assert_eq!(visible(&panel), vec!["root/0", "root/0/Widget", "root/0/createWidget"]);

        // 切换到另一个文档，默认展开
        panel.set_model(second.build());
        settle(&mut pool, &panel);
        assert_eq!(
            visible(&panel),
            vec!["root/0", "root/0/Widget", "root/0/Widget/render", "root/0/createWidget"]
        );

        // 回到第一个文档时恢复折叠状态
        panel.set_model(first.build());
        settle(&mut pool, &panel);
        assert_eq!(visible(&panel), vec!["root/0", "root/0/Widget", "root/0/createWidget"]);
        assert!(panel.view_state(&second.uri).is_some());
    }

    #[test]
    fn test_refresh_keeps_state() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        let snapshot = snapshot("file:///work/widget.ts");

        panel.set_model(snapshot.build());
        settle(&mut pool, &panel);
        let model = panel.model().unwrap();
        let render = model.get_item_by_id("root/0/Widget/render").unwrap();
        panel.tree().borrow_mut().expand(&render);
        settle(&mut pool, &panel);

        panel.set_model(snapshot.build());
        settle(&mut pool, &panel);
        assert_eq!(
            visible(&panel),
            vec![
                "root/0",
                "root/0/Widget",
                "root/0/Widget/render",
                "root/0/Widget/render/frame",
                "root/0/createWidget"
            ]
        );
    }

    #[test]
    fn test_sort_order() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        panel.set_model(snapshot("file:///work/widget.ts").build());
        settle(&mut pool, &panel);

        panel.set_sort_order(OutlineItemCompareType::ByName);
        assert_eq!(
            visible(&panel),
            vec!["root/0", "root/0/createWidget", "root/0/Widget", "root/0/Widget/render"]
        );
        assert_eq!(panel.config().sort_order, OutlineItemCompareType::ByName);
        assert_eq!(
            panel.take_events(),
            vec![OutlinePanelEvent::SortOrderChanged(OutlineItemCompareType::ByName)]
        );

        panel.set_sort_order(OutlineItemCompareType::ByName);
        assert!(panel.take_events().is_empty());
    }

    #[test]
    fn test_click_events() {
        let mut pool = LocalPool::new();
        let (mut panel, errors) = panel(&pool);
        panel.set_model(snapshot("file:///work/widget.ts").build());
        settle(&mut pool, &panel);
        panel.take_events();

        let model = panel.model().unwrap();
        let render = model.get_item_by_id("root/0/Widget/render").unwrap();
        let group = model.get_item_by_id("root/0").unwrap();
        let uri = Url::parse("file:///work/widget.ts").unwrap();
        let range = Range::new(4, 5, 9, 6);

        panel.tree().borrow_mut().handle_click(&render, ClickEvent::row()).unwrap();
        panel.tree().borrow_mut().handle_click(&render, ClickEvent::double()).unwrap();
        panel.tree().borrow_mut().handle_click(&group, ClickEvent::twistie()).unwrap();
        assert_eq!(
            panel.take_events(),
            vec![
                OutlinePanelEvent::RevealSymbol {
                    uri: uri.clone(),
                    range,
                    preserve_focus: true
                },
                OutlinePanelEvent::OpenSymbol { uri, range },
            ]
        );
        assert!(errors.try_recv().is_err());
    }

    #[test]
    fn test_reveal_position() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        assert!(!panel.reveal_position(Position::new(5, 10)));

        panel.set_model(snapshot("file:///work/widget.ts").build());
        settle(&mut pool, &panel);
        panel.collapse_all();
        assert_eq!(visible(&panel), vec!["root/0"]);

        assert!(panel.reveal_position(Position::new(5, 10)));
        settle(&mut pool, &panel);
        let tree = panel.tree().borrow();
        let frame: Vec<&str> = tree.selection().iter().map(|node| node.id()).collect();
        assert_eq!(frame, vec!["root/0/Widget/render/frame"]);
        assert_eq!(tree.focus().map(|node| node.id()), Some("root/0/Widget/render/frame"));
        assert!(tree.navigator().any(|node| node.id() == "root/0/Widget/render/frame"));
        drop(tree);

        assert!(!panel.reveal_position(Position::new(100, 1)));
    }

    #[test]
    fn test_filter_keeps_saved_expansion() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        let source = snapshot("file:///work/widget.ts").build();
        let expanded = vec![
            "root/0",
            "root/0/Widget",
            "root/0/Widget/render",
            "root/0/Widget/render/frame",
            "root/0/createWidget",
        ];

        panel.set_model(source.clone());
        settle(&mut pool, &panel);
        let render = source.get_item_by_id("root/0/Widget/render").unwrap();
        panel.tree().borrow_mut().expand(&render);
        settle(&mut pool, &panel);
        assert_eq!(visible(&panel), expanded);

        // 没有任何匹配的过滤
        panel.set_model(Rc::new(source.rescored(|_| None)));
        settle(&mut pool, &panel);
        assert_eq!(visible(&panel), vec!["root/0"]);

        // 清空过滤后恢复之前的展开状态
        panel.set_model(source.clone());
        settle(&mut pool, &panel);
        assert_eq!(visible(&panel), expanded);
    }

    #[test]
    fn test_view_states_are_capped() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        let uri = |index: usize| format!("file:///work/file{}.ts", index);

        // 最后一个文档仍在显示，它的状态还没有保存
        for index in 0..MAX_VIEW_STATES + 2 {
            panel.set_model(snapshot(&uri(index)).build());
            settle(&mut pool, &panel);
        }
        assert!(panel.view_state(&Url::parse(&uri(0)).unwrap()).is_none());
        assert!(panel.view_state(&Url::parse(&uri(1)).unwrap()).is_some());
        assert!(panel.view_state(&Url::parse(&uri(MAX_VIEW_STATES)).unwrap()).is_some());

        // 重新访问的文档移到最新位置，淘汰顺序排在 3 之后
        panel.set_model(snapshot(&uri(1)).build());
        settle(&mut pool, &panel);
        panel.set_model(snapshot(&uri(2)).build());
        settle(&mut pool, &panel);
        assert!(panel.view_state(&Url::parse(&uri(1)).unwrap()).is_some());
        assert!(panel.view_state(&Url::parse(&uri(3)).unwrap()).is_some());

        panel.set_model(snapshot(&uri(4)).build());
        settle(&mut pool, &panel);
        assert!(panel.view_state(&Url::parse(&uri(3)).unwrap()).is_none());
        assert!(panel.view_state(&Url::parse(&uri(1)).unwrap()).is_some());
    }

    #[test]
    fn test_clear_saves_state() {
        let mut pool = LocalPool::new();
        let (mut panel, _errors) = panel(&pool);
        let snapshot = snapshot("file:///work/widget.ts");
        panel.set_model(snapshot.build());
        settle(&mut pool, &panel);

        panel.clear();
        assert!(panel.model().is_none());
        assert_eq!(
            panel.view_state(&snapshot.uri).map(|state| state.expanded.clone()),
            Some(vec!["root/0".to_string(), "root/0/Widget".to_string()])
        );
    }
}
