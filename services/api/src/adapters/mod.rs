pub mod db;
pub mod pool;
pub mod quote_llm;
pub mod stores;

pub use db::DbAdapter;
pub use pool::SharedPool;
pub use quote_llm::OpenAiQuoteAdapter;
pub use stores::Stores;
