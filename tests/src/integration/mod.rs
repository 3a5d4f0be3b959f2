//! End-to-end authorization flows through a realm.

pub mod fixtures;

mod call_flow;
mod fault_flow;
mod publish_flow;
