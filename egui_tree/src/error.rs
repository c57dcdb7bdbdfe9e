//! 树组件错误类型

use futures::task::SpawnError;

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// 节点尚未加载到树中（或已随输入替换而失效）
    #[error("element `{0}` is not present in the tree")]
    ElementNotFound(String),
    /// 节点没有子节点，无法展开/折叠
    #[error("element `{0}` cannot be expanded")]
    NotExpandable(String),
    #[error("failed to spawn tree task: {0}")]
    Spawn(#[from] SpawnError),
}
