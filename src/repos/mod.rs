pub mod dynamo;
pub mod error;
pub mod policy_store;
