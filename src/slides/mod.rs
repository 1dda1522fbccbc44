//! Everything that talks to the Slides `batchUpdate` endpoint.
//!
//! - **Requests**: serde types matching the remote wire format
//! - **Builder**: pure functions turning an intent into an ordered [`Batch`]
//! - **Service**: [`SlidesService`] trait + [`HttpSlidesService`]
//! - **Retry**: bounded resubmission for image insertion

pub mod builder;
pub mod requests;
pub mod retry;
pub mod service;

pub use builder::{
    Placement, build_create_slide, build_image, build_images, build_textbox, new_object_id,
};
pub use requests::{Batch, BatchReply, EditOperation};
pub use retry::{
    IMAGE_INSERT_ATTEMPTS, ImageInsertOutcome, RetryPolicy, insert_image, insert_images,
};
pub use service::{
    HttpSlidesService, PresentationState, RemoteError, SlidesError, SlidesService,
    extract_created_id,
};
