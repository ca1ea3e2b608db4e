pub mod articles;
pub mod functions;
pub mod images;
pub mod notices;
pub mod preferences;
pub mod query;
pub mod storage;
