mod archive;
mod config;
mod manifest;

pub use archive::ArchiveType;
pub use config::{EasyboxConfig, CONFIG_FILE_NAME};
pub use manifest::{validate_app_name, AppManifest, ApplicationDescriptor, EMPTY_MANIFEST};
