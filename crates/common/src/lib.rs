//! Common routes, header values, URL builders and errors shared by the media
//! server and the applications that embed it.

pub mod error;
pub mod protocol;

pub use error::StoreError;
