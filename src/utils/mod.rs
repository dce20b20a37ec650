pub mod page;
pub mod progress;
pub mod retry;

pub use page::{page_slice, total_pages};
pub use progress::{format_duration, format_mib, format_size, format_speed};
pub use retry::RetryPolicy;
