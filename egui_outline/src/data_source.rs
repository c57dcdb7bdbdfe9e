//! 大纲树的导航适配器

use crate::model::{OutlineNode, TreeNode};
use egui_tree::TreeDataSource;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

#[derive(Clone, Copy, Debug, Default)]
pub struct OutlineDataSource;

impl TreeDataSource<OutlineNode> for OutlineDataSource {
    fn get_id(&self, element: &OutlineNode) -> String {
        element.id().to_string()
    }

    /// 没有分数的符号视为没有子节点，即使它的子节点集合非空
    fn has_children(&self, element: &OutlineNode) -> bool {
        match element.kind() {
            TreeNode::Root(_) => true,
            TreeNode::Element(symbol) if symbol.score().is_none() => false,
            _ => element.child_count() > 0,
        }
    }

    fn get_children(&self, element: &OutlineNode) -> LocalBoxFuture<'static, Vec<OutlineNode>> {
        match element.kind() {
            TreeNode::Root(model) => {
                let request = model.request();
                let root = element.clone();
                async move {
                    request.await;
                    root.children()
                }
                .boxed_local()
            }
            _ => futures::future::ready(element.children()).boxed_local(),
        }
    }

    fn get_parent(&self, element: &OutlineNode) -> Option<OutlineNode> {
        element.parent()
    }

    /// 只自动展开前两层：分组和分组下的顶层符号
    fn should_autoexpand(&self, element: &OutlineNode) -> bool {
        match element.kind() {
            TreeNode::Root(_) | TreeNode::Group(_) => true,
            TreeNode::Element(_) => element
                .parent()
                .is_some_and(|parent| matches!(parent.kind(), TreeNode::Group(_))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutlineModel, OutlineModelBuilder};
    use crate::symbol::{FuzzyScore, Range, SymbolInformation, SymbolKind};
    use futures::executor::block_on;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;
    use url::Url;

    fn model() -> Rc<OutlineModel> {
        let uri = Url::parse("file:///work/lib.go").unwrap();
        let symbol = |name: &str, kind| SymbolInformation::new(name, kind, uri.clone(), Range::new(1, 1, 1, 10));
        let mut builder = OutlineModelBuilder::new(uri.clone());
        let group = builder.add_group("golang.go");
        let server = builder.add_element(&group, symbol("Server", SymbolKind::Struct)).unwrap();
        let serve = builder.add_element(&server, symbol("Serve", SymbolKind::Method)).unwrap();
        builder.add_element(&serve, symbol("listener", SymbolKind::Variable));
        builder.add_element(&group, symbol("main", SymbolKind::Function));
        builder.build()
    }

    fn ids(nodes: &[OutlineNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.id()).collect()
    }

    #[test]
    fn test_has_children() {
        let model = model();
        let source = OutlineDataSource;
        assert!(source.has_children(&model.root()));
        assert!(source.has_children(&model.get_item_by_id("root/0").unwrap()));
        assert!(source.has_children(&model.get_item_by_id("root/0/Server").unwrap()));
        assert!(!source.has_children(&model.get_item_by_id("root/0/main").unwrap()));

        // 没有分数时即使有子节点也报告为叶子
        let unscored = Rc::new(model.rescored(|_| None));
        assert!(!source.has_children(&unscored.get_item_by_id("root/0/Server").unwrap()));
        assert!(!source.has_children(&unscored.get_item_by_id("root/0/main").unwrap()));

        let scored = Rc::new(model.rescored(|_| Some(FuzzyScore::new(1, Vec::new()))));
        assert!(!source.has_children(&scored.get_item_by_id("root/0/main").unwrap()));
        assert!(source.has_children(&scored.get_item_by_id("root/0/Server").unwrap()));
    }

    #[test]
    fn test_get_children_in_mapping_order() {
        let model = model();
        let source = OutlineDataSource;
        let groups = block_on(source.get_children(&model.root()));
        assert_eq!(ids(&groups), vec!["root/0"]);
        let symbols = block_on(source.get_children(&groups[0]));
        assert_eq!(ids(&symbols), vec!["root/0/Server", "root/0/main"]);
    }

    #[test]
    fn test_root_children_wait_for_request() {
        let (sender, receiver) = futures::channel::oneshot::channel::<()>();
        let mut builder = OutlineModelBuilder::new(Url::parse("file:///work/empty.go").unwrap());
        builder.add_group("golang.go");
        let model = builder.build_with_request(async move {
            let _ = receiver.await;
        });

        let mut children = OutlineDataSource.get_children(&model.root());
        assert!((&mut children).now_or_never().is_none());
        sender.send(()).unwrap();
        assert_eq!(ids(&block_on(children)), vec!["root/0"]);
    }

    #[test]
    fn test_parent_and_autoexpand() {
        let model = model();
        let source = OutlineDataSource;
        let serve = model.get_item_by_id("root/0/Server/Serve").unwrap();
        assert_eq!(
            source.get_parent(&serve).map(|node| node.id().to_string()),
            Some("root/0/Server".to_string())
        );
        assert!(source.get_parent(&model.root()).is_none());

        assert!(source.should_autoexpand(&model.root()));
        assert!(source.should_autoexpand(&model.get_item_by_id("root/0").unwrap()));
        assert!(source.should_autoexpand(&model.get_item_by_id("root/0/Server").unwrap()));
        assert!(!source.should_autoexpand(&serve));
        assert!(!source.should_autoexpand(&model.get_item_by_id("root/0/Server/Serve/listener").unwrap()));
    }
}
