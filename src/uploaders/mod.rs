pub mod limits;
pub mod progress_stream;
pub mod resilient;
pub mod transport;

pub use limits::{MAX_UPLOAD_SIZE, timeout_for_size};
pub use progress_stream::{BytesCallback, ProgressStream};
pub use resilient::ResilientUploader;
pub use transport::{MultipartTransport, UploadFile, UploadRequest, UploadTransport};
