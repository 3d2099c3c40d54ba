pub mod context;
pub mod error;
pub mod manager;

pub use context::{AppContext, AppContextBuilder};
pub use error::{Result, TwtError};
pub use manager::{LexTwtManager, TwtManager};
