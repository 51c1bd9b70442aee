pub mod cleanup;
pub mod download;
pub mod upload;
