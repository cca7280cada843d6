//! Container engine orchestration for the picopypi build image.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod engine;
pub mod inspect;
pub mod process;
pub mod run;
