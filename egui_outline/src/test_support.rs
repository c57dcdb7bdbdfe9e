use crate::comparator::OutlineItemComparator;
use crate::config::OutlineConfig;
use crate::error::ErrorReporter;
use crate::extensions::StaticExtensionRegistry;
use crate::panel::{create_outline_tree, OutlineServices};
use crate::path_label::WorkspacePathLabels;
use crate::state::OutlineTree;
use futures::executor::LocalPool;
use std::cell::RefCell;
use std::rc::Rc;

pub(crate) fn outline_tree(pool: &LocalPool, errors: ErrorReporter) -> Rc<RefCell<OutlineTree>> {
    let services = OutlineServices {
        extensions: Rc::new(StaticExtensionRegistry::default()),
        path_labels: Rc::new(WorkspacePathLabels::default()),
        errors,
    };
    let comparator = Rc::new(OutlineItemComparator::default());
    let tree = create_outline_tree(&services, comparator, &OutlineConfig::default(), pool.spawner());
    Rc::new(RefCell::new(tree))
}

/// 运行执行器直到没有新的子节点加载
pub(crate) fn settle(pool: &mut LocalPool, tree: &Rc<RefCell<OutlineTree>>) {
    loop {
        pool.run_until_stalled();
        if !tree.borrow_mut().process_pending() {
            break;
        }
    }
}
