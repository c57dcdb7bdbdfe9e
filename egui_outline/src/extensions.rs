//! 扩展注册表端口

use futures::future::LocalBoxFuture;
use futures::FutureExt;

/// 已安装扩展的描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionDescription {
    /// 形如 `publisher.name` 的标识
    pub id: String,
    pub display_name: Option<String>,
}

impl ExtensionDescription {
    pub fn new(id: impl Into<String>, display_name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.map(str::to_string),
        }
    }
}

pub trait ExtensionRegistry {
    /// 异步列出所有已安装扩展
    fn get_extensions(&self) -> LocalBoxFuture<'static, anyhow::Result<Vec<ExtensionDescription>>>;
}

/// 固定列表的注册表
#[derive(Clone, Debug, Default)]
pub struct StaticExtensionRegistry {
    extensions: Vec<ExtensionDescription>,
}

impl StaticExtensionRegistry {
    pub fn new(extensions: Vec<ExtensionDescription>) -> Self {
        Self { extensions }
    }
}

impl ExtensionRegistry for StaticExtensionRegistry {
    fn get_extensions(&self) -> LocalBoxFuture<'static, anyhow::Result<Vec<ExtensionDescription>>> {
        futures::future::ready(Ok(self.extensions.clone())).boxed_local()
    }
}
