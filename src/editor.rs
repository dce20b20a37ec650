use std::time::Duration;
use tracing::{info, warn};
use crate::api::AdminClient;
use crate::board::UploadBoard;
use crate::core::{ClientError, FileType, Platform, Result, UploadReceipt, Work, WorkDraft};
use crate::uploaders::{
    MultipartTransport, ResilientUploader, UploadFile, UploadRequest, UploadTransport,
};

const DEFAULT_PRUNE_AFTER: Duration = Duration::from_secs(3);

/// 一批上传的结果
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 上传成功的 (键, 回执)
    pub uploaded: Vec<(String, UploadReceipt)>,
    /// 第一个失败的文件及原因，之后的文件不再上传
    pub failed: Option<(String, ClientError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// 管理端的作品编辑会话
///
/// 持有作品的本地副本，上传和删除文件后同步更新，`save` 时写回服务器。
pub struct WorkEditor<T = MultipartTransport> {
    admin: AdminClient,
    uploader: ResilientUploader<T>,
    board: UploadBoard,
    work: Work,
    persisted: bool,
    prune_after: Duration,
}

impl<T: UploadTransport> WorkEditor<T> {
    /// 编辑服务器上已存在的作品
    pub fn new(admin: AdminClient, uploader: ResilientUploader<T>, work: Work) -> Self {
        Self {
            admin,
            uploader,
            board: UploadBoard::new(),
            work,
            persisted: true,
            prune_after: DEFAULT_PRUNE_AFTER,
        }
    }

    /// 编辑尚未创建的新作品，首次 `save` 时创建
    pub fn create(admin: AdminClient, uploader: ResilientUploader<T>, work: Work) -> Self {
        Self {
            persisted: false,
            ..Self::new(admin, uploader, work)
        }
    }

    /// 从服务器载入已有作品
    pub async fn load(admin: AdminClient, uploader: ResilientUploader<T>, id: &str) -> Result<Self> {
        let work = admin.work(id).await?;
        Ok(Self::new(admin, uploader, work))
    }

    pub fn with_prune_after(mut self, prune_after: Duration) -> Self {
        self.prune_after = prune_after;
        self
    }

    pub fn with_board(mut self, board: UploadBoard) -> Self {
        self.board = board;
        self
    }

    pub fn work(&self) -> &Work {
        &self.work
    }

    pub fn work_mut(&mut self) -> &mut Work {
        &mut self.work
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn board(&self) -> &UploadBoard {
        &self.board
    }

    /// 逐个上传文件
    ///
    /// 每个文件成功后立即记入本地作品；某个文件失败时该批次停止，
    /// 剩余条目标记为失败。无论结果如何，面板都会在 `prune_after` 后清理。
    pub async fn upload_files(
        &mut self,
        file_type: FileType,
        platform: Option<Platform>,
        files: Vec<UploadFile>,
    ) -> Result<BatchReport> {
        if self.work.id.trim().is_empty() || !self.persisted {
            return Err(ClientError::MissingWorkId);
        }
        if file_type == FileType::Platform && platform.is_none() {
            return Err(ClientError::config("platform is required for platform uploads"));
        }

        let keys = self.board.begin_batch(&files);
        let mut report = BatchReport::default();

        for (key, file) in keys.into_iter().zip(files) {
            let request = UploadRequest::new(self.work.id.clone(), file_type, file)
                .with_platform(platform.clone());
            match self.uploader.upload(&request, Some(self.board.callback(&key))).await {
                Ok(receipt) => {
                    self.work.attach_file(file_type, platform.clone(), &receipt.filename);
                    self.board.complete(&key);
                    report.uploaded.push((key, receipt));
                }
                Err(err) => {
                    warn!("upload of {} failed, stopping batch: {}", request.file.name, err);
                    self.board.fail(&key, &err.to_string());
                    self.board.fail_active("Batch stopped after an earlier failure");
                    report.failed = Some((key, err));
                    break;
                }
            }
        }

        self.board.settle(self.prune_after);
        info!(
            "upload batch finished: {} uploaded, {} failed",
            report.uploaded.len(),
            usize::from(report.failed.is_some())
        );
        Ok(report)
    }

    /// 删除服务器上的文件并同步本地作品
    pub async fn delete_file(
        &mut self,
        file_type: FileType,
        filename: &str,
        platform: Option<Platform>,
    ) -> Result<()> {
        self.admin
            .delete_file(&self.work.id, file_type, filename, platform.clone())
            .await?;
        self.work.detach_file(file_type, platform, filename);
        Ok(())
    }

    pub fn set_cover(&mut self, filename: &str) -> Result<()> {
        self.work.set_cover(filename)
    }

    pub fn toggle_platform(&mut self, platform: Platform, enabled: bool) {
        self.work.toggle_platform(platform, enabled);
    }

    /// 新作品调用创建接口，否则调用更新接口
    pub async fn save(&mut self) -> Result<()> {
        if self.work.id.trim().is_empty() {
            return Err(ClientError::MissingWorkId);
        }

        if !self.persisted {
            let id = self.admin.create_work(&WorkDraft::from(&self.work)).await?;
            self.work = self.admin.work(&id).await?;
            self.persisted = true;
        } else {
            self.admin.update_work(&self.work.id, &self.work).await?;
        }
        Ok(())
    }
}
