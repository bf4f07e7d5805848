//! Update Module
//!
//! Release check for installed (standalone) launches: compares the published
//! version descriptor with the build version and the last acknowledged one,
//! and shows a one-time "what's new" modal.

mod markdown;
mod notifier;
mod version;

pub use markdown::format_release_notes;
pub use notifier::{
    LaunchContext, UpdateModal, UpdateNotifier, UpdateState, VersionDescriptor, CHECK_DELAY,
    VERSION_CHECK_URL,
};
pub use version::{is_newer, Version};
