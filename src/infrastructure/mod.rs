pub mod git;
pub mod lfs;
pub mod persistence;
pub mod storage;
