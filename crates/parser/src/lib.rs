pub mod language;
pub mod text;

pub use language::{primary_subtag, resolve as resolve_language};
pub use text::{process_content, process_description, process_title, to_plain_text, truncate_text};
