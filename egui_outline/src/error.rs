//! 错误类型与错误上报通道

use crossbeam_channel::{Receiver, Sender};
use egui_tree::TreeError;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum OutlineError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("invalid outline snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// 异步副作用失败时的上报端口
///
/// 错误不会向调用方传播，也不会重试；宿主从接收端读取后自行展示。
#[derive(Clone, Debug)]
pub struct ErrorReporter {
    sender: Sender<OutlineError>,
}

impl ErrorReporter {
    pub fn new(sender: Sender<OutlineError>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, Receiver<OutlineError>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self::new(sender), receiver)
    }

    pub fn report(&self, error: impl Into<OutlineError>) {
        let error = error.into();
        log::error!("Unexpected outline error: {}", error);
        if self.sender.try_send(error).is_err() {
            log::debug!("Error receiver is gone, dropping report");
        }
    }
}
