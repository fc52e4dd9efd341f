//! Connection-profile storage.

pub mod error;
mod file;
mod memory;
mod repo;

pub use error::ProfileError;
pub use file::FileProfileRepository;
pub use memory::MemoryProfileRepository;
pub use repo::{
    DEFAULT_BROKER_URL, DEFAULT_PROFILE_NAME, ProfileRepository, ProfileUpdate,
    create_default_profile, find_profile,
};
