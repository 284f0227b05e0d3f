//! 上传存储 - 基础设施层
//!
//! 保存已上传的选票图片和候选人数据，进程退出即丢失

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::contest::ContestUpload;
use crate::models::upload::UploadedImage;

#[derive(Debug, Clone, Default)]
pub struct UploadStore {
    images: Arc<RwLock<HashMap<String, UploadedImage>>>,
    contests: Arc<RwLock<HashMap<String, ContestUpload>>>,
}

impl UploadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_image(&self, image: UploadedImage) {
        self.images
            .write()
            .await
            .insert(image.file_id.clone(), image);
    }

    pub async fn image(&self, file_id: &str) -> Option<UploadedImage> {
        self.images.read().await.get(file_id).cloned()
    }

    pub async fn insert_contests(&self, upload: ContestUpload) {
        self.contests
            .write()
            .await
            .insert(upload.data_id.clone(), upload);
    }

    pub async fn contests(&self, data_id: &str) -> Option<ContestUpload> {
        self.contests.read().await.get(data_id).cloned()
    }
}
