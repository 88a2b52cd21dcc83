pub mod protocol;
pub mod selector;
pub mod signature;
pub mod validator_set;

pub use protocol::*;
pub use selector::*;
pub use signature::*;
pub use validator_set::*;
