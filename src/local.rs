pub mod fs_local_repository;
pub mod local_repository;
