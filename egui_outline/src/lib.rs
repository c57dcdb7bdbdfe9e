//! # egui_outline
//!
//! 基于 egui_tree 的大纲（符号树）视图。
//!
//! ## 功能特性
//!
//! - **排序**：按位置、名称或符号类型排序，分组按提供者注册顺序排列
//! - **过滤**：隐藏没有匹配分数的符号，分组始终可见
//! - **异步加载**：根节点等待模型计算完成后再显示分组
//! - **渲染**：符号图标与高亮标签，分组标签异步解析扩展显示名称
//! - **状态恢复**：按 id 保存展开、选中和焦点，模型刷新后自动恢复
//! - **点击行为**：单击符号行只选中，展开/折叠只通过展开按钮
//!
//! ## 基本使用
//!
//! ```rust,ignore
//! use egui_outline::{OutlineConfig, OutlinePanel, OutlineServices, OutlineSnapshot};
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let mut panel = OutlinePanel::new(services, OutlineConfig::load_or_default(), pool.spawner());
//! panel.set_model(OutlineSnapshot::from_json(json)?.build());
//!
//! // 每帧
//! pool.run_until_stalled();
//! panel.ui(ui);
//! for event in panel.take_events() {
//!     // 在编辑器中显示符号
//! }
//! ```

mod comparator;
mod config;
mod controller;
mod data_source;
mod error;
mod extensions;
mod filter;
mod model;
mod panel;
mod path_label;
mod renderer;
mod snapshot;
mod state;
mod symbol;
#[cfg(test)]
mod test_support;

pub use comparator::{compare_symbol_names, OutlineItemComparator, OutlineItemCompareType};
pub use config::OutlineConfig;
pub use controller::OutlineController;
pub use data_source::OutlineDataSource;
pub use error::{ErrorReporter, OutlineError};
pub use extensions::{ExtensionDescription, ExtensionRegistry, StaticExtensionRegistry};
pub use filter::OutlineItemFilter;
pub use model::{
    OutlineElement, OutlineGroup, OutlineModel, OutlineModelBuilder, OutlineNode, OutlineRequest,
    ProviderRef, TreeNode, ROOT_ID,
};
pub use panel::{create_outline_tree, OutlinePanel, MAX_VIEW_STATES, OutlinePanelEvent, OutlineServices};
pub use path_label::{PathLabelProvider, WorkspacePathLabels};
pub use renderer::{
    create_matches, ElementTemplate, GroupTemplate, HighlightedLabel, OutlineRenderer, OutlineTemplate,
    SymbolIcon, ELEMENT_TEMPLATE_ID, GROUP_TEMPLATE_ID, OUTLINE_ROW_HEIGHT,
};
pub use snapshot::{GroupSnapshot, OutlineSnapshot, SymbolSnapshot};
pub use state::{OutlineTree, OutlineTreeState};
pub use symbol::{FuzzyScore, Position, Range, SymbolInformation, SymbolKind};
