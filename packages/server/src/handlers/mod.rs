pub mod file;
pub mod storage;
