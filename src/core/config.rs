mod parsing;
mod settings;
mod types;

pub(crate) use types::{AiSettings, Settings, StoreBackend, UploadSettings};
