pub mod abi;
pub mod decoder;
pub mod gateway;
pub mod interfaces;
pub mod node;
pub mod provider;
pub mod retry;
pub mod types;
pub mod units;

pub use abi::ERC20;
pub use decoder::decode_transfer_log;
pub use gateway::Gateway;
pub use node::ChainNode;
pub use provider::{AlloyNode, create_provider};
pub use retry::RetryPolicy;
pub use types::*;
