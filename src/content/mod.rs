pub mod projects;

pub use projects::{Project, ProjectStatus, ProjectTag};
