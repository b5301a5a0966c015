pub mod connector;
pub mod contract;

pub use connector::{ChainConnector, Connection};
pub use contract::{ClaimStatus, RewardContract, RewardContractClient};
