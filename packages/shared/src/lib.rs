//! Meetboard の server / tooling で共有するユーティリティ。

pub mod logger;
pub mod sanitize;
pub mod time;
