use std::sync::Arc;

use crate::application::{content::ContentServices, uploads::ImageUploader};

#[derive(Clone)]
pub struct AdminState {
    pub content: ContentServices,
    pub uploader: Arc<dyn ImageUploader>,
    pub upload_limit_bytes: u64,
}
