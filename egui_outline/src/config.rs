//! 大纲面板配置
//!
//! 配置以 JSON 保存在用户配置目录下：`<config_dir>/egui_outline/outline.json`。

use crate::comparator::OutlineItemCompareType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub sort_order: OutlineItemCompareType,
    /// 每级缩进宽度
    pub indent: f32,
    /// 点击分组整行时是否切换展开状态
    pub expand_on_click: bool,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            sort_order: OutlineItemCompareType::ByPosition,
            indent: 12.0,
            expand_on_click: true,
        }
    }
}

impl OutlineConfig {
    /// 默认配置文件路径，无法确定配置目录时返回 `None`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("egui_outline").join("outline.json"))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), io::Error> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json_content = serde_json::to_string_pretty(self)?;
        fs::write(path, json_content)?;
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, io::Error> {
        let json_content = fs::read_to_string(path)?;
        serde_json::from_str(&json_content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON解析错误: {}", e)))
    }

    /// 读取默认路径下的配置，文件不存在或无效时使用默认值
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        match Self::load_from_path(&path) {
            Ok(config) => config,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                log::warn!("Ignoring outline config {}: {}", path.display(), err);
                Self::default()
            }
        }
    }
}
