//! Client code for linkmirror.
//!
//! This crate provides target-URL resolution, the headless-browser
//! extraction pipeline, and the rclone publisher used by the server.

pub mod browser;
pub mod publish;
pub mod resolver;
pub mod target;

pub use browser::{AnchorInfo, BrowserOptions, BrowserSession, Candidate, Extracted, locate_control};
pub use publish::{Publisher, RclonePublisher};
pub use resolver::{BrowserResolver, Resolver};
pub use target::TargetTemplate;
