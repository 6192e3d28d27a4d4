pub mod context;
pub mod dispatch;
pub mod feed;
pub mod html;
pub mod jq_source;
pub mod opml;
pub mod raw_scan;

pub use context::{DispatchContext, HandlerOutput};
pub use dispatch::dispatch;
