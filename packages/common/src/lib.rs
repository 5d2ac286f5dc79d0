pub mod knowledge;
pub mod storage;
