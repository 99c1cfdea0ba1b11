mod core;
mod pipelines;

pub use self::core::GitLabClient;
