pub mod cleanup;

pub use cleanup::CleanupSweeper;
