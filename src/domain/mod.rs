pub mod comments;
pub mod file;
pub mod twt;
pub mod twter;
pub mod twts;

pub use comments::{Comment, Comments};
pub use file::TwtFile;
pub use twt::{twt_hash, Twt, TWT_HASH_LENGTH};
pub use twter::{normalize_username, Twter};
pub use twts::Twts;
