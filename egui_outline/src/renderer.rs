//! 大纲行渲染
//!
//! 分组行只有一个标签，符号行由图标和标签组成。模板在行槽位创建时构建一次，
//! 之后每次绑定新元素只更新模板中的数据。

use crate::extensions::ExtensionRegistry;
use crate::model::{OutlineElement, OutlineGroup, OutlineNode, TreeNode};
use crate::path_label::PathLabelProvider;
use crate::symbol::SymbolKind;
use egui::text::{LayoutJob, TextFormat};
use egui::*;
use egui_tree::{RowState, TreeRenderer};
use futures::executor::LocalSpawner;
use futures::future::{AbortHandle, Abortable};
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::ops::Range;
use std::rc::{Rc, Weak};

/// 所有行等高
pub const OUTLINE_ROW_HEIGHT: f32 = 22.0;

pub const GROUP_TEMPLATE_ID: &str = "group";
pub const ELEMENT_TEMPLATE_ID: &str = "element";

const ICON_WIDTH: f32 = 18.0;

/// 把匹配到的字符下标合并成连续区间
pub fn create_matches(matches: &[usize]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for &index in matches {
        match ranges.last_mut() {
            Some(last) if last.end == index => last.end += 1,
            _ => ranges.push(index..index + 1),
        }
    }
    ranges
}

/// 带高亮区间的文本标签，区间按字符计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HighlightedLabel {
    text: String,
    highlights: Vec<Range<usize>>,
    title: Option<String>,
}

impl HighlightedLabel {
    pub fn set(&mut self, text: impl Into<String>, highlights: Vec<Range<usize>>, title: Option<String>) {
        self.text = text.into();
        self.highlights = highlights;
        self.title = title;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn highlights(&self) -> &[Range<usize>] {
        &self.highlights
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn layout_job(&self, font_id: FontId, color: Color32, highlight_color: Color32) -> LayoutJob {
        let mut job = LayoutJob::default();
        let format = |highlighted: bool| {
            TextFormat::simple(font_id.clone(), if highlighted { highlight_color } else { color })
        };

        let mut run_start = 0;
        let mut run_highlighted = false;
        for (char_index, (byte_index, _)) in self.text.char_indices().enumerate() {
            let highlighted = self.highlights.iter().any(|range| range.contains(&char_index));
            if highlighted != run_highlighted && byte_index > run_start {
                job.append(&self.text[run_start..byte_index], 0.0, format(run_highlighted));
                run_start = byte_index;
            }
            run_highlighted = highlighted;
        }
        if run_start < self.text.len() {
            job.append(&self.text[run_start..], 0.0, format(run_highlighted));
        }
        job
    }

    /// 释放标签持有的内容
    pub fn dispose(&mut self) {
        self.text.clear();
        self.highlights.clear();
        self.title = None;
    }
}

/// 符号图标，只是一段带类名的文本，没有需要释放的资源
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolIcon {
    kind: Option<SymbolKind>,
    class: String,
}

impl SymbolIcon {
    pub fn set_kind(&mut self, kind: SymbolKind) {
        self.kind = Some(kind);
        self.class = format!("outline-element-icon symbol-icon {}", kind.css_class());
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn kind(&self) -> Option<SymbolKind> {
        self.kind
    }

    fn glyph(&self) -> &'static str {
        self.kind.map(|kind| icon_style(kind).0).unwrap_or("")
    }

    fn color(&self, fallback: Color32) -> Color32 {
        self.kind.map(|kind| icon_style(kind).1).unwrap_or(fallback)
    }
}

fn icon_style(kind: SymbolKind) -> (&'static str, Color32) {
    const PURPLE: Color32 = Color32::from_rgb(178, 128, 215);
    const ORANGE: Color32 = Color32::from_rgb(238, 157, 40);
    const BLUE: Color32 = Color32::from_rgb(117, 190, 255);
    const GRAY: Color32 = Color32::from_gray(170);

    match kind {
        SymbolKind::File => ("F", GRAY),
        SymbolKind::Module => ("M", GRAY),
        SymbolKind::Namespace => ("{}", GRAY),
        SymbolKind::Package => ("P", GRAY),
        SymbolKind::Class => ("C", ORANGE),
        SymbolKind::Method => ("m", PURPLE),
        SymbolKind::Property => ("p", GRAY),
        SymbolKind::Field => ("f", BLUE),
        SymbolKind::Constructor => ("c", PURPLE),
        SymbolKind::Enum => ("E", ORANGE),
        SymbolKind::Interface => ("I", BLUE),
        SymbolKind::Function => ("ƒ", PURPLE),
        SymbolKind::Variable => ("v", BLUE),
        SymbolKind::Constant => ("K", GRAY),
        SymbolKind::String => ("S", GRAY),
        SymbolKind::Number => ("#", GRAY),
        SymbolKind::Boolean => ("B", GRAY),
        SymbolKind::Array => ("[]", GRAY),
        SymbolKind::Object => ("O", GRAY),
        SymbolKind::Key => ("k", GRAY),
        SymbolKind::Null => ("∅", GRAY),
        SymbolKind::EnumMember => ("e", BLUE),
        SymbolKind::Struct => ("S", ORANGE),
        SymbolKind::Event => ("!", ORANGE),
        SymbolKind::Operator => ("±", GRAY),
        SymbolKind::TypeParameter => ("T", GRAY),
    }
}

pub struct ElementTemplate {
    pub icon: SymbolIcon,
    pub label: HighlightedLabel,
}

/// 分组模板。标签和绑定的分组 id 由异步查询以弱引用共享。
pub struct GroupTemplate {
    label: Rc<RefCell<HighlightedLabel>>,
    bound: Rc<RefCell<Option<String>>>,
    /// 当前绑定分组的扩展 id
    extension_id: Option<String>,
    lookup: Option<AbortHandle>,
}

impl GroupTemplate {
    fn new() -> Self {
        Self {
            label: Rc::new(RefCell::new(HighlightedLabel::default())),
            bound: Rc::new(RefCell::new(None)),
            extension_id: None,
            lookup: None,
        }
    }

    fn cancel_lookup(&mut self) {
        if let Some(handle) = self.lookup.take() {
            handle.abort();
        }
    }

    pub fn label(&self) -> HighlightedLabel {
        self.label.borrow().clone()
    }
}

pub enum OutlineTemplate {
    Group(GroupTemplate),
    Element(ElementTemplate),
}

impl OutlineTemplate {
    pub fn label_text(&self) -> String {
        match self {
            OutlineTemplate::Group(template) => template.label.borrow().text().to_string(),
            OutlineTemplate::Element(template) => template.label.text().to_string(),
        }
    }

    pub fn icon_class(&self) -> Option<&str> {
        match self {
            OutlineTemplate::Group(_) => None,
            OutlineTemplate::Element(template) => Some(template.icon.class()),
        }
    }
}

pub struct OutlineRenderer {
    extensions: Rc<dyn ExtensionRegistry>,
    path_labels: Rc<dyn PathLabelProvider>,
    spawner: LocalSpawner,
    /// 第一次绘制时记录，异步查询完成后用来请求重绘
    repaint: Rc<RefCell<Option<Context>>>,
}

impl OutlineRenderer {
    pub fn new(
        extensions: Rc<dyn ExtensionRegistry>,
        path_labels: Rc<dyn PathLabelProvider>,
        spawner: LocalSpawner,
    ) -> Self {
        Self {
            extensions,
            path_labels,
            spawner,
            repaint: Rc::new(RefCell::new(None)),
        }
    }

    fn render_element_row(&self, element: &OutlineElement, template: &mut ElementTemplate) {
        let symbol = element.symbol();
        template.icon.set_kind(symbol.kind);

        let highlights = element
            .score()
            .map(|score| create_matches(&score.matches))
            .unwrap_or_default();
        let title = format!(
            "line {} in {}",
            symbol.range.start.line_number,
            self.path_labels.uri_label(&symbol.uri)
        );
        template.label.set(symbol.name.clone(), highlights, Some(title));
    }

    /// 先显示扩展 id，再异步查找扩展的显示名称。
    /// 查询完成时模板已绑定到其他分组则丢弃结果。
    /// 重新绑定到同一分组时保留已解析的名称和进行中的查询。
    fn render_group_row(&self, group: &OutlineGroup, template: &mut GroupTemplate) {
        let group_id = group.id().to_string();
        let extension_id = group.provider().extension_id.clone();
        if template.bound.borrow().as_deref() == Some(group_id.as_str())
            && template.extension_id.as_deref() == Some(extension_id.as_str())
        {
            return;
        }
        template.cancel_lookup();

        template.label.borrow_mut().set(extension_id.clone(), Vec::new(), None);
        *template.bound.borrow_mut() = Some(group_id.clone());
        template.extension_id = Some(extension_id.clone());

        let lookup = self.extensions.get_extensions();
        let label = Rc::downgrade(&template.label);
        let bound = Rc::downgrade(&template.bound);
        let repaint = self.repaint.clone();
        let (handle, registration) = AbortHandle::new_pair();
        let task = Abortable::new(
            async move {
                let display_name = match lookup.await {
                    Ok(extensions) => extensions
                        .into_iter()
                        .find(|extension| extension.id == extension_id)
                        .and_then(|extension| extension.display_name),
                    Err(err) => {
                        log::debug!("Extension lookup for {} failed: {}", extension_id, err);
                        None
                    }
                };
                if let Some(display_name) = display_name {
                    apply_group_label(&label, &bound, &group_id, display_name, &repaint);
                }
            },
            registration,
        );

        match self.spawner.spawn_local(async move {
            let _ = task.await;
        }) {
            Ok(()) => template.lookup = Some(handle),
            Err(err) => log::warn!("Failed to spawn extension lookup: {}", err),
        }
    }
}

fn apply_group_label(
    label: &Weak<RefCell<HighlightedLabel>>,
    bound: &Weak<RefCell<Option<String>>>,
    group_id: &str,
    display_name: String,
    repaint: &RefCell<Option<Context>>,
) {
    let (Some(label), Some(bound)) = (label.upgrade(), bound.upgrade()) else {
        return;
    };
    if bound.borrow().as_deref() != Some(group_id) {
        log::debug!("Row was rebound, dropping label for {}", group_id);
        return;
    }
    label.borrow_mut().set(display_name, Vec::new(), None);
    if let Some(ctx) = repaint.borrow().as_ref() {
        ctx.request_repaint();
    }
}

impl TreeRenderer<OutlineNode> for OutlineRenderer {
    type Template = OutlineTemplate;

    fn row_height(&self, _element: &OutlineNode) -> f32 {
        OUTLINE_ROW_HEIGHT
    }

    fn template_id(&self, element: &OutlineNode) -> &'static str {
        match element.kind() {
            TreeNode::Element(_) => ELEMENT_TEMPLATE_ID,
            TreeNode::Root(_) | TreeNode::Group(_) => GROUP_TEMPLATE_ID,
        }
    }

    fn render_template(&self, template_id: &str) -> OutlineTemplate {
        if template_id == ELEMENT_TEMPLATE_ID {
            OutlineTemplate::Element(ElementTemplate {
                icon: SymbolIcon::default(),
                label: HighlightedLabel::default(),
            })
        } else {
            OutlineTemplate::Group(GroupTemplate::new())
        }
    }

    fn render_element(&self, element: &OutlineNode, _template_id: &str, template: &mut OutlineTemplate) {
        match (element.kind(), template) {
            (TreeNode::Element(symbol), OutlineTemplate::Element(template)) => {
                self.render_element_row(symbol, template)
            }
            (TreeNode::Group(group), OutlineTemplate::Group(template)) => self.render_group_row(group, template),
            (TreeNode::Root(_), _) => {}
            _ => log::debug!("Template does not match node {}", element.id()),
        }
    }

    fn paint(&self, ui: &mut Ui, rect: Rect, template: &OutlineTemplate, state: RowState) {
        if self.repaint.borrow().is_none() {
            *self.repaint.borrow_mut() = Some(ui.ctx().clone());
        }

        let visuals = ui.visuals();
        let color = if state.selected {
            visuals.strong_text_color()
        } else {
            visuals.text_color()
        };
        let highlight_color = visuals.hyperlink_color;
        let font_id = TextStyle::Body.resolve(ui.style());
        let painter = ui.painter().with_clip_rect(rect);

        let mut left = rect.left() + 2.0;
        let job = match template {
            OutlineTemplate::Group(template) => {
                template
                    .label
                    .borrow()
                    .layout_job(font_id, visuals.weak_text_color(), highlight_color)
            }
            OutlineTemplate::Element(template) => {
                painter.text(
                    pos2(left + ICON_WIDTH / 2.0, rect.center().y),
                    Align2::CENTER_CENTER,
                    template.icon.glyph(),
                    FontId::monospace(12.0),
                    template.icon.color(color),
                );
                left += ICON_WIDTH + 2.0;
                template.label.layout_job(font_id, color, highlight_color)
            }
        };

        let galley = ui.fonts(|fonts| fonts.layout_job(job));
        let pos = pos2(left, rect.center().y - galley.size().y / 2.0);
        painter.galley(pos, galley, color);
    }

    fn tooltip(&self, template: &OutlineTemplate) -> Option<String> {
        match template {
            OutlineTemplate::Element(template) => template.label.title().map(str::to_string),
            OutlineTemplate::Group(_) => None,
        }
    }

    fn dispose_template(&self, _template_id: &str, template: OutlineTemplate) {
        match template {
            OutlineTemplate::Group(mut template) => {
                template.cancel_lookup();
                template.label.borrow_mut().dispose();
                template.bound.borrow_mut().take();
                template.extension_id = None;
            }
            OutlineTemplate::Element(mut template) => template.label.dispose(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::{ExtensionDescription, StaticExtensionRegistry};
    use crate::model::{OutlineModel, OutlineModelBuilder};
    use crate::path_label::WorkspacePathLabels;
    use crate::symbol::{FuzzyScore, Range as SourceRange, SymbolInformation};
    use futures::executor::LocalPool;
    use futures::future::LocalBoxFuture;
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use url::Url;

    struct FailingRegistry;

    impl ExtensionRegistry for FailingRegistry {
        fn get_extensions(&self) -> LocalBoxFuture<'static, anyhow::Result<Vec<ExtensionDescription>>> {
            async { Err(anyhow::anyhow!("extension host is not running")) }.boxed_local()
        }
    }

    fn model() -> Rc<OutlineModel> {
        let uri = Url::parse("file:///work/project/src/main.rs").unwrap();
        let mut builder = OutlineModelBuilder::new(uri.clone());
        let group = builder.add_group("rust-lang.rust-analyzer");
        builder.add_group("vscode.markdown");
        builder.add_element(
            &group,
            SymbolInformation::new("parse_args", SymbolKind::Function, uri, SourceRange::new(3, 1, 12, 2)),
        );
        builder.build()
    }

    fn renderer(pool: &LocalPool, registry: Rc<dyn ExtensionRegistry>) -> OutlineRenderer {
        let labels = WorkspacePathLabels::new(Some(PathBuf::from("/work/project"))).with_home_dir(None);
        OutlineRenderer::new(registry, Rc::new(labels), pool.spawner())
    }

    fn registry() -> Rc<dyn ExtensionRegistry> {
        Rc::new(StaticExtensionRegistry::new(vec![
            ExtensionDescription::new("rust-lang.rust-analyzer", Some("rust-analyzer")),
            ExtensionDescription::new("vscode.markdown", Some("Markdown Language Features")),
        ]))
    }

    fn render(renderer: &OutlineRenderer, node: &OutlineNode) -> OutlineTemplate {
        let template_id = renderer.template_id(node);
        let mut template = renderer.render_template(template_id);
        renderer.render_element(node, template_id, &mut template);
        template
    }

    #[test]
    fn test_create_matches() {
        assert_eq!(create_matches(&[0, 1, 2, 5, 7, 8]), vec![0..3, 5..6, 7..9]);
        assert!(create_matches(&[]).is_empty());
    }

    #[test]
    fn test_layout_job_sections() {
        let mut label = HighlightedLabel::default();
        label.set("naïve", vec![1..3], None);
        let job = label.layout_job(FontId::default(), Color32::WHITE, Color32::RED);
        let sections: Vec<(&str, Color32)> = job
            .sections
            .iter()
            .map(|section| (&job.text[section.byte_range.clone()], section.format.color))
            .collect();
        assert_eq!(
            sections,
            vec![("n", Color32::WHITE), ("aï", Color32::RED), ("ve", Color32::WHITE)]
        );
    }

    #[test]
    fn test_element_row() {
        let pool = LocalPool::new();
        let renderer = renderer(&pool, registry());
        let model = model();
        let node = model.get_item_by_id("root/0/parse_args").unwrap();

        assert_eq!(renderer.row_height(&node), OUTLINE_ROW_HEIGHT);
        let template = render(&renderer, &node);
        assert_eq!(template.label_text(), "parse_args");
        assert_eq!(
            template.icon_class(),
            Some("outline-element-icon symbol-icon function")
        );
        assert_eq!(
            renderer.tooltip(&template).as_deref(),
            Some("line 3 in src/main.rs")
        );
        match &template {
            OutlineTemplate::Element(template) => assert!(template.label.highlights().is_empty()),
            OutlineTemplate::Group(_) => panic!("expected element template"),
        }

        let scored = Rc::new(model.rescored(|_| Some(FuzzyScore::new(12, vec![0, 1, 6]))));
        let node = scored.get_item_by_id("root/0/parse_args").unwrap();
        match render(&renderer, &node) {
            OutlineTemplate::Element(template) => {
                assert_eq!(template.label.highlights(), &[0..2, 6..7]);
            }
            OutlineTemplate::Group(_) => panic!("expected element template"),
        }
    }

    #[test]
    fn test_group_label_resolves_display_name() {
        let mut pool = LocalPool::new();
        let renderer = renderer(&pool, registry());
        let model = model();
        let template = render(&renderer, &model.get_item_by_id("root/0").unwrap());

        // 查询完成前先显示扩展 id
        assert_eq!(template.label_text(), "rust-lang.rust-analyzer");
        pool.run_until_stalled();
        assert_eq!(template.label_text(), "rust-analyzer");
        assert!(renderer.tooltip(&template).is_none());
    }

    #[test]
    fn test_group_label_fallbacks() {
        let mut pool = LocalPool::new();
        let unknown = renderer(&pool, Rc::new(StaticExtensionRegistry::default()));
        let failing = renderer(&pool, Rc::new(FailingRegistry));
        let model = model();
        let group = model.get_item_by_id("root/1").unwrap();

        let first = render(&unknown, &group);
        let second = render(&failing, &group);
        pool.run_until_stalled();
        assert_eq!(first.label_text(), "vscode.markdown");
        assert_eq!(second.label_text(), "vscode.markdown");
    }

    #[test]
    fn test_rebound_group_ignores_stale_lookup() {
        let mut pool = LocalPool::new();
        let renderer = renderer(&pool, registry());
        let model = model();

        let mut template = render(&renderer, &model.get_item_by_id("root/0").unwrap());
        renderer.render_element(&model.get_item_by_id("root/1").unwrap(), GROUP_TEMPLATE_ID, &mut template);
        pool.run_until_stalled();
        assert_eq!(template.label_text(), "Markdown Language Features");

        // 查询完成前回收模板，结果直接丢弃
        let template = render(&renderer, &model.get_item_by_id("root/0").unwrap());
        renderer.dispose_template(GROUP_TEMPLATE_ID, template);
        pool.run_until_stalled();
    }

    #[test]
    fn test_same_group_keeps_resolved_label() {
        let mut pool = LocalPool::new();
        let renderer = renderer(&pool, registry());
        let model = model();
        let group = model.get_item_by_id("root/0").unwrap();

        let mut template = render(&renderer, &group);
        pool.run_until_stalled();
        assert_eq!(template.label_text(), "rust-analyzer");

        // 刷新后重新绑定，不回退到扩展 id
        renderer.render_element(&group, GROUP_TEMPLATE_ID, &mut template);
        assert_eq!(template.label_text(), "rust-analyzer");
        let refreshed = self::model();
        renderer.render_element(&refreshed.get_item_by_id("root/0").unwrap(), GROUP_TEMPLATE_ID, &mut template);
        assert_eq!(template.label_text(), "rust-analyzer");

        // 同一 id 换成了其他扩展
        let uri = Url::parse("file:///work/project/README.md").unwrap();
        let mut builder = OutlineModelBuilder::new(uri);
        builder.add_group("vscode.markdown");
        let other = builder.build();
        renderer.render_element(&other.get_item_by_id("root/0").unwrap(), GROUP_TEMPLATE_ID, &mut template);
        assert_eq!(template.label_text(), "vscode.markdown");
        pool.run_until_stalled();
        assert_eq!(template.label_text(), "Markdown Language Features");
    }

    #[test]
    fn test_stale_binding_guard() {
        let template = GroupTemplate::new();
        *template.bound.borrow_mut() = Some("root/1".to_string());
        template.label.borrow_mut().set("vscode.markdown", Vec::new(), None);

        let repaint = RefCell::new(None);
        let label = Rc::downgrade(&template.label);
        let bound = Rc::downgrade(&template.bound);
        apply_group_label(&label, &bound, "root/0", "rust-analyzer".to_string(), &repaint);
        assert_eq!(template.label().text(), "vscode.markdown");

        apply_group_label(&label, &bound, "root/1", "Markdown".to_string(), &repaint);
        assert_eq!(template.label().text(), "Markdown");
    }
}
