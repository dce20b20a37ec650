pub mod api;
pub mod board;
pub mod config;
pub mod core;
pub mod editor;
pub mod telemetry;
pub mod uploaders;
pub mod utils;

// 重新导出常用类型
pub use api::{AdminClient, AdminToken, ApiClient, MediaLinks};
pub use board::{UploadBoard, UploadItem};
pub use config::Config;
pub use core::{
    ClientError,
    FileType,
    Platform,
    Result,
    Settings,
    UploadEvent,
    UploadProgress,
    UploadStatus,
    Work,
    WorkDraft,
    WorkList,
};
pub use editor::{BatchReport, WorkEditor};
pub use uploaders::{MultipartTransport, ResilientUploader, UploadFile, UploadRequest, UploadTransport};

#[cfg(test)]
mod tests;
