//! 源文件路径的显示文本

use std::path::{Path, PathBuf};
use url::Url;

pub trait PathLabelProvider {
    fn uri_label(&self, uri: &Url) -> String;
}

/// 工作区内的文件显示相对路径，主目录下的文件用 `~` 缩写，
/// 其他本地文件显示完整路径，非 `file` 协议直接显示 URI。
#[derive(Clone, Debug, Default)]
pub struct WorkspacePathLabels {
    workspace_root: Option<PathBuf>,
    home_dir: Option<PathBuf>,
}

impl WorkspacePathLabels {
    pub fn new(workspace_root: Option<PathBuf>) -> Self {
        Self {
            workspace_root,
            home_dir: dirs::home_dir(),
        }
    }

    pub fn with_home_dir(mut self, home_dir: Option<PathBuf>) -> Self {
        self.home_dir = home_dir;
        self
    }

    fn compact(&self, path: &Path) -> PathBuf {
        if cfg!(any(target_os = "linux", target_os = "macos")) {
            if let Some(relative) = self
                .home_dir
                .as_deref()
                .and_then(|home| path.strip_prefix(home).ok())
            {
                return Path::new("~").join(relative);
            }
        }
        path.to_path_buf()
    }
}

impl PathLabelProvider for WorkspacePathLabels {
    fn uri_label(&self, uri: &Url) -> String {
        if uri.scheme() != "file" {
            return uri.to_string();
        }
        let Ok(path) = uri.to_file_path() else {
            return uri.to_string();
        };

        if let Some(relative) = self
            .workspace_root
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
        {
            return relative.display().to_string();
        }
        self.compact(&path).display().to_string()
    }
}
