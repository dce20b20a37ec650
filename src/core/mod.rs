mod errors;
mod progress;
mod types;
mod work;

pub use errors::{AttemptError, ClientError, Result, UploadFailure};
pub use progress::{
    eta,
    ProgressCallback,
    SpeedMeter,
    UploadEvent,
    UploadProgress,
    UploadStatus,
};
pub use types::{
    DataResponse,
    FileType,
    LikeResponse,
    ListResponse,
    MutationResponse,
    Platform,
    Settings,
    UploadReceipt,
    Work,
    WorkDraft,
    WorkList,
};
