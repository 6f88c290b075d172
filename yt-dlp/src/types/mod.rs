mod events;
mod info_json;
mod options;

pub use events::{JsonEvent, JsonRun};
pub use info_json::InfoJson;
pub use options::{Container, DownloadOptions, OutputFormat};
