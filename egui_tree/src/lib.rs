//! # egui_tree
//!
//! 一个基于模板渲染的通用 egui 树组件。
//!
//! ## 功能特性
//!
//! - **适配器注入**：数据源、渲染器、排序器、过滤器、点击控制器均可替换
//! - **异步加载**：子节点在本地执行器上异步加载，过期的加载结果自动丢弃
//! - **展开/折叠**：按 id 保存展开状态，支持自动展开、全部折叠、定位节点
//! - **选择与焦点**：单选、焦点、双击激活事件
//! - **虚拟化**：只为可见行创建模板，行槽位复用模板
//!
//! ## 基本使用
//!
//! ```rust,ignore
//! use egui_tree::{Tree, TreeConfiguration, TreeOptions};
//! use futures::executor::LocalPool;
//!
//! let mut pool = LocalPool::new();
//! let mut tree = Tree::new(configuration, TreeOptions::default(), pool.spawner());
//! tree.set_input(root);
//!
//! // 每帧
//! pool.run_until_stalled();
//! tree.ui(ui);
//! for event in tree.take_events() {
//!     // 处理选择、激活等事件
//! }
//! ```

mod contract;
mod controller;
mod error;
mod tree;

pub use contract::{RowState, TreeDataSource, TreeFilter, TreeRenderer, TreeSorter};
pub use controller::{ClickEvent, DefaultController, TreeController};
pub use error::TreeError;
pub use tree::{Tree, TreeConfiguration, TreeEvent, TreeOptions};
