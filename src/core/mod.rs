//! Enforcement core: state, plan parsing and diffing, shell classification, keyword
//! dispatch, the tool gate and hook plumbing.

pub mod assets;
pub mod bash_safety;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod gate;
pub mod git;
pub mod hooks;
pub mod output;
pub mod plan_diff;
pub mod status;
pub mod store;
pub mod sync;
pub mod tasks;
pub mod time;
pub mod workitems;
