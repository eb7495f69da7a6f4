pub mod requests;
pub mod srv_session;
pub mod transaction;

pub use requests::OpenFile;
pub use srv_session::SrvSession;
pub use transaction::{LocalTransactionService, Transaction, TransactionService, TransactionStats};
