//! 大纲模型
//!
//! 模型以 id 为键保存所有节点，父节点拥有子节点的有序 id 集合，
//! 子节点只记录父节点的 id，需要时通过模型查找。

use crate::symbol::{FuzzyScore, Position, SymbolInformation};
use futures::future::{LocalBoxFuture, Shared};
use futures::{Future, FutureExt};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use url::Url;

/// 根节点 id
pub const ROOT_ID: &str = "root";

/// 模型计算任务，可被多次克隆并等待
pub type OutlineRequest = Shared<LocalBoxFuture<'static, ()>>;

/// 提供符号的扩展
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRef {
    pub extension_id: String,
    /// 注册顺序，会话内稳定
    pub index: usize,
}

#[derive(Clone, Debug)]
pub struct OutlineGroup {
    id: String,
    parent: String,
    provider: ProviderRef,
    children: IndexSet<String>,
}

impl OutlineGroup {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> &ProviderRef {
        &self.provider
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[derive(Clone, Debug)]
pub struct OutlineElement {
    id: String,
    parent: String,
    symbol: SymbolInformation,
    score: Option<FuzzyScore>,
    children: IndexSet<String>,
}

impl OutlineElement {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbol(&self) -> &SymbolInformation {
        &self.symbol
    }

    pub fn score(&self) -> Option<&FuzzyScore> {
        self.score.as_ref()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[derive(Clone, Debug)]
enum OutlineEntry {
    Group(OutlineGroup),
    Element(OutlineElement),
}

impl OutlineEntry {
    fn parent(&self) -> &str {
        match self {
            OutlineEntry::Group(group) => &group.parent,
            OutlineEntry::Element(element) => &element.parent,
        }
    }

    fn children_mut(&mut self) -> &mut IndexSet<String> {
        match self {
            OutlineEntry::Group(group) => &mut group.children,
            OutlineEntry::Element(element) => &mut element.children,
        }
    }
}

pub struct OutlineModel {
    uri: Url,
    request: OutlineRequest,
    children: IndexSet<String>,
    entries: HashMap<String, OutlineEntry>,
    /// 由 `rescored` 生成，部分符号可能被过滤隐藏
    filtered: bool,
}

impl fmt::Debug for OutlineModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineModel")
            .field("uri", &self.uri)
            .field("groups", &self.children)
            .field("entries", &self.entries.len())
            .field("filtered", &self.filtered)
            .finish()
    }
}

impl OutlineModel {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn request(&self) -> OutlineRequest {
        self.request.clone()
    }

    pub fn root(self: &Rc<Self>) -> OutlineNode {
        OutlineNode {
            model: self.clone(),
            id: ROOT_ID.to_string(),
        }
    }

    /// 按 id 查找节点，id 不存在时返回 `None`
    pub fn get_item_by_id(self: &Rc<Self>, id: &str) -> Option<OutlineNode> {
        if id == ROOT_ID || self.entries.contains_key(id) {
            Some(OutlineNode {
                model: self.clone(),
                id: id.to_string(),
            })
        } else {
            None
        }
    }

    /// 包含该位置的最深层符号
    pub fn get_item_enclosing_position(self: &Rc<Self>, position: Position) -> Option<OutlineNode> {
        self.children
            .iter()
            .filter_map(|id| match self.entries.get(id) {
                Some(OutlineEntry::Group(group)) => self.find_enclosing(&group.children, position),
                _ => None,
            })
            .next()
            .and_then(|id| self.get_item_by_id(&id))
    }

    fn find_enclosing(&self, ids: &IndexSet<String>, position: Position) -> Option<String> {
        for id in ids {
            if let Some(OutlineEntry::Element(element)) = self.entries.get(id) {
                if element.symbol.range.contains_position(position) {
                    return Some(
                        self.find_enclosing(&element.children, position)
                            .unwrap_or_else(|| id.clone()),
                    );
                }
            }
        }
        None
    }

    /// 用新的分数重建模型。命中符号的祖先至少得到中性分数，保证命中项可见。
    pub fn rescored(&self, score: impl Fn(&SymbolInformation) -> Option<FuzzyScore>) -> OutlineModel {
        let mut entries = self.entries.clone();
        let mut matched = Vec::new();
        for (id, entry) in entries.iter_mut() {
            if let OutlineEntry::Element(element) = entry {
                element.score = score(&element.symbol);
                if element.score.is_some() {
                    matched.push(id.clone());
                }
            }
        }

        for id in matched {
            let mut parent = entries.get(&id).map(|entry| entry.parent().to_string());
            while let Some(parent_id) = parent {
                match entries.get_mut(&parent_id) {
                    Some(OutlineEntry::Element(element)) => {
                        if element.score.is_none() {
                            element.score = Some(FuzzyScore::neutral());
                        }
                        parent = Some(element.parent.clone());
                    }
                    _ => parent = None,
                }
            }
        }

        OutlineModel {
            uri: self.uri.clone(),
            request: self.request.clone(),
            children: self.children.clone(),
            entries,
            filtered: true,
        }
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered
    }
}

/// 树中的节点类型
#[derive(Debug, Clone, Copy)]
pub enum TreeNode<'a> {
    Root(&'a OutlineModel),
    Group(&'a OutlineGroup),
    Element(&'a OutlineElement),
}

/// 指向模型中某个节点的句柄
#[derive(Clone)]
pub struct OutlineNode {
    model: Rc<OutlineModel>,
    id: String,
}

impl OutlineNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &Rc<OutlineModel> {
        &self.model
    }

    pub fn kind(&self) -> TreeNode<'_> {
        match self.model.entries.get(&self.id) {
            Some(OutlineEntry::Group(group)) => TreeNode::Group(group),
            Some(OutlineEntry::Element(element)) => TreeNode::Element(element),
            // 句柄只能通过模型创建，不在 entries 中的只有根节点
            None => TreeNode::Root(&self.model),
        }
    }

    pub fn parent(&self) -> Option<OutlineNode> {
        let parent = match self.kind() {
            TreeNode::Root(_) => return None,
            TreeNode::Group(group) => &group.parent,
            TreeNode::Element(element) => &element.parent,
        };
        self.model.get_item_by_id(parent)
    }

    fn child_ids(&self) -> &IndexSet<String> {
        match self.kind() {
            TreeNode::Root(model) => &model.children,
            TreeNode::Group(group) => &group.children,
            TreeNode::Element(element) => &element.children,
        }
    }

    /// 按插入顺序返回子节点
    pub fn children(&self) -> Vec<OutlineNode> {
        self.child_ids()
            .iter()
            .filter_map(|id| self.model.get_item_by_id(id))
            .collect()
    }

    pub fn child_count(&self) -> usize {
        self.child_ids().len()
    }
}

impl PartialEq for OutlineNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.model, &other.model) && self.id == other.id
    }
}

impl Eq for OutlineNode {}

impl fmt::Debug for OutlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineNode").field("id", &self.id).finish()
    }
}

/// 构建大纲模型
pub struct OutlineModelBuilder {
    uri: Url,
    children: IndexSet<String>,
    entries: HashMap<String, OutlineEntry>,
}

impl OutlineModelBuilder {
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            children: IndexSet::new(),
            entries: HashMap::new(),
        }
    }

    /// 添加一个提供者分组，返回分组 id
    pub fn add_group(&mut self, extension_id: impl Into<String>) -> String {
        let index = self.children.len();
        let id = format!("{}/{}", ROOT_ID, index);
        self.entries.insert(
            id.clone(),
            OutlineEntry::Group(OutlineGroup {
                id: id.clone(),
                parent: ROOT_ID.to_string(),
                provider: ProviderRef {
                    extension_id: extension_id.into(),
                    index,
                },
                children: IndexSet::new(),
            }),
        );
        self.children.insert(id.clone());
        id
    }

    /// 在分组或符号下添加符号，父节点不存在时返回 `None`。
    /// 新符号带中性分数，即“没有过滤条件”的状态。
    pub fn add_element(&mut self, parent: &str, symbol: SymbolInformation) -> Option<String> {
        if !self.entries.contains_key(parent) {
            log::warn!("Cannot add symbol {} to unknown parent {}", symbol.name, parent);
            return None;
        }

        let id = self.find_id(parent, &symbol.name);
        self.entries.insert(
            id.clone(),
            OutlineEntry::Element(OutlineElement {
                id: id.clone(),
                parent: parent.to_string(),
                symbol,
                score: Some(FuzzyScore::neutral()),
                children: IndexSet::new(),
            }),
        );
        if let Some(entry) = self.entries.get_mut(parent) {
            entry.children_mut().insert(id.clone());
        }
        Some(id)
    }

    /// 同级同名符号追加 `_n` 后缀
    fn find_id(&self, parent: &str, name: &str) -> String {
        let base = format!("{}/{}", parent, name);
        let mut id = base.clone();
        let mut suffix = 1;
        while self.entries.contains_key(&id) {
            id = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        id
    }

    /// 构建已完成计算的模型
    pub fn build(self) -> Rc<OutlineModel> {
        self.build_with_request(futures::future::ready(()))
    }

    /// 构建仍在计算中的模型，`request` 完成前根节点的子节点不可用
    pub fn build_with_request(self, request: impl Future<Output = ()> + 'static) -> Rc<OutlineModel> {
        Rc::new(OutlineModel {
            uri: self.uri,
            request: request.boxed_local().shared(),
            children: self.children,
            entries: self.entries,
            filtered: false,
        })
    }
}
