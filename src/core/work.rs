//! 作品的媒体文件维护
//!
//! 上传、删除文件后同步本地的 [`Work`]，并保证封面始终是截图列表中的一项。

use super::errors::{ClientError, Result};
use super::types::{FileType, Platform, Work};

impl Work {
    /// 记录一个上传成功的文件
    ///
    /// 图片在没有封面时自动成为封面。平台文件缺少 `platform` 时忽略。
    pub fn attach_file(&mut self, file_type: FileType, platform: Option<Platform>, filename: &str) {
        match file_type {
            FileType::Image => {
                push_unique(&mut self.screenshots, filename);
                if self.cover.is_empty() {
                    self.cover = filename.to_string();
                }
            }
            FileType::Video => push_unique(&mut self.videos, filename),
            FileType::Platform => {
                if let Some(platform) = platform {
                    push_unique(self.file_names.entry(platform).or_default(), filename);
                }
            }
        }
    }

    /// 移除一个已删除的文件，返回是否真的移除了
    ///
    /// 删除当前封面时，封面改为剩余的第一张截图；没有剩余截图则清空。
    pub fn detach_file(&mut self, file_type: FileType, platform: Option<Platform>, filename: &str) -> bool {
        match file_type {
            FileType::Image => {
                let removed = remove_all(&mut self.screenshots, filename);
                if self.cover == filename {
                    self.cover = self.screenshots.first().cloned().unwrap_or_default();
                }
                removed
            }
            FileType::Video => remove_all(&mut self.videos, filename),
            FileType::Platform => match platform.and_then(|p| self.file_names.get_mut(&p)) {
                Some(files) => remove_all(files, filename),
                None => false,
            },
        }
    }

    pub fn set_cover(&mut self, filename: &str) -> Result<()> {
        if !self.screenshots.iter().any(|s| s == filename) {
            return Err(ClientError::InvalidCover(filename.to_string()));
        }

        self.cover = filename.to_string();
        Ok(())
    }

    /// 勾选或取消平台，取消时一并移除该平台的文件列表
    pub fn toggle_platform(&mut self, platform: Platform, enabled: bool) {
        if enabled {
            self.platforms.insert(platform);
        } else {
            self.platforms.remove(&platform);
            self.file_names.remove(&platform);
        }
    }
}

fn push_unique(list: &mut Vec<String>, filename: &str) {
    if !list.iter().any(|f| f == filename) {
        list.push(filename.to_string());
    }
}

fn remove_all(list: &mut Vec<String>, filename: &str) -> bool {
    let before = list.len();
    list.retain(|f| f != filename);
    list.len() != before
}
