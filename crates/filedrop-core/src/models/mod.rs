//! Data models for the application

pub mod share;

// Re-export all models for convenient imports
pub use share::{
    CleanupSummary, DownloadResponse, PresignedUpload, ShareRecord, UploadRequest, UploadResponse,
};
