//! 上传进度面板
//!
//! 以 `文件名_序号` 为键记录一批上传中每个文件的状态，供进度界面读取。
//! 批次结束后延迟清理已结束的条目，若期间开始了新批次则不清理。

use std::sync::Arc;
use std::time::Duration;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use crate::core::{ClientError, ProgressCallback, Result, UploadEvent, UploadStatus};
use crate::uploaders::UploadFile;

/// 面板上的一个上传条目
#[derive(Debug, Clone, PartialEq)]
pub struct UploadItem {
    pub file_name: String,
    pub file_size: u64,
    pub bytes_uploaded: u64,
    pub percentage: u8,
    pub speed: f64,
    pub eta: Option<Duration>,
    pub retry_count: u32,
    pub status: UploadStatus,
}

impl UploadItem {
    fn new(file_name: &str, file_size: u64) -> Self {
        Self {
            file_name: file_name.to_string(),
            file_size,
            bytes_uploaded: 0,
            percentage: 0,
            speed: 0.0,
            eta: None,
            retry_count: 0,
            status: UploadStatus::Uploading,
        }
    }

    /// 按事件更新，终态条目忽略后续事件
    fn apply(&mut self, event: &UploadEvent) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        match event {
            UploadEvent::Progress(progress) => {
                self.bytes_uploaded = progress.bytes_uploaded;
                self.file_size = progress.total_bytes;
                self.percentage = progress.percentage;
                self.speed = progress.speed;
                self.eta = progress.eta;
                self.retry_count = progress.retry_count;
                self.status = UploadStatus::Uploading;
            }
            UploadEvent::Retrying { retry_count, message, .. } => {
                self.bytes_uploaded = 0;
                self.percentage = 0;
                self.speed = 0.0;
                self.eta = None;
                self.retry_count = *retry_count;
                self.status = UploadStatus::Retrying {
                    message: message.clone(),
                };
            }
        }
        true
    }
}

pub fn file_key(file_name: &str, index: usize) -> String {
    format!("{file_name}_{index}")
}

#[derive(Debug, Default)]
struct BoardState {
    generation: u64,
    items: Vec<(String, UploadItem)>,
}

impl BoardState {
    fn get_mut(&mut self, key: &str) -> Option<&mut UploadItem> {
        self.items.iter_mut().find(|(k, _)| k == key).map(|(_, item)| item)
    }

    fn prune_terminal(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|(_, item)| item.status.is_active());
        before - self.items.len()
    }
}

/// 上传进度面板，克隆后共享同一份状态
#[derive(Debug, Clone)]
pub struct UploadBoard {
    state: Arc<RwLock<BoardState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for UploadBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadBoard {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(BoardState::default())),
            revision: Arc::new(revision),
        }
    }

    /// 每次状态变化后递增的版本号
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// 开始新批次：清空旧条目，为每个文件建立一个上传中的条目，返回各自的键
    pub fn begin_batch(&self, files: &[UploadFile]) -> Vec<String> {
        let keys: Vec<String> = files
            .iter()
            .enumerate()
            .map(|(index, file)| file_key(&file.name, index))
            .collect();

        {
            let mut state = self.state.write();
            state.generation += 1;
            state.items = keys
                .iter()
                .zip(files)
                .map(|(key, file)| (key.clone(), UploadItem::new(&file.name, file.size)))
                .collect();
        }

        self.notify();
        keys
    }

    pub fn apply(&self, key: &str, event: &UploadEvent) -> bool {
        let changed = self
            .state
            .write()
            .get_mut(key)
            .map(|item| item.apply(event))
            .unwrap_or(false);
        if changed {
            self.notify();
        }
        changed
    }

    /// 返回把事件写入 `key` 条目的回调
    pub fn callback(&self, key: &str) -> ProgressCallback {
        let board = self.clone();
        let key = key.to_string();
        Arc::new(move |event: UploadEvent| {
            board.apply(&key, &event);
        })
    }

    pub fn complete(&self, key: &str) -> bool {
        self.finish(key, |item| {
            item.percentage = 100;
            item.bytes_uploaded = item.file_size;
            item.speed = 0.0;
            item.eta = Some(Duration::ZERO);
            item.status = UploadStatus::Completed;
        })
    }

    pub fn fail(&self, key: &str, reason: &str) -> bool {
        self.finish(key, |item| {
            item.speed = 0.0;
            item.eta = None;
            item.status = UploadStatus::Error(reason.to_string());
        })
    }

    fn finish<F: FnOnce(&mut UploadItem)>(&self, key: &str, f: F) -> bool {
        let changed = match self.state.write().get_mut(key) {
            Some(item) if item.status.is_active() => {
                f(item);
                true
            }
            _ => false,
        };
        if changed {
            self.notify();
        }
        changed
    }

    /// 将所有未结束的条目标记为失败，返回数量
    pub fn fail_active(&self, reason: &str) -> usize {
        let mut count = 0;
        {
            let mut state = self.state.write();
            for (_, item) in state.items.iter_mut().filter(|(_, item)| item.status.is_active()) {
                item.speed = 0.0;
                item.eta = None;
                item.status = UploadStatus::Error(reason.to_string());
                count += 1;
            }
        }
        if count > 0 {
            self.notify();
        }
        count
    }

    /// 批次结束，`delay` 后清理已完成和失败的条目
    pub fn settle(&self, delay: Duration) -> JoinHandle<()> {
        let board = self.clone();
        let generation = self.state.read().generation;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let removed = {
                let mut state = board.state.write();
                if state.generation != generation {
                    debug!("new upload batch started, skip pruning");
                    return;
                }
                state.prune_terminal()
            };
            if removed > 0 {
                debug!("pruned {} finished upload entries", removed);
                board.notify();
            }
        })
    }

    /// 关闭面板，有上传进行中时拒绝
    pub fn dismiss(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.items.iter().any(|(_, item)| item.status.is_active()) {
                return Err(ClientError::UploadsInProgress);
            }
            state.generation += 1;
            state.items.clear();
        }
        self.notify();
        Ok(())
    }

    pub fn is_busy(&self) -> bool {
        self.state.read().items.iter().any(|(_, item)| item.status.is_active())
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<UploadItem> {
        self.state
            .read()
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, item)| item.clone())
    }

    /// 按加入顺序返回所有条目
    pub fn snapshot(&self) -> Vec<(String, UploadItem)> {
        self.state.read().items.clone()
    }
}
