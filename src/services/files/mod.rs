pub mod download;
pub mod info;
pub mod upload;

use actix_multipart::Multipart;
use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;

use crate::errors::RelayError;
use crate::storage::ObjectStore;

pub struct FileService;

impl FileService {
    pub fn new_lazy() -> Self {
        Self
    }

    pub(crate) fn get_store(&self, request: &HttpRequest) -> Result<Arc<ObjectStore>, RelayError> {
        request
            .app_data::<web::Data<ObjectStore>>()
            .map(|store| store.clone().into_inner())
            .ok_or_else(|| RelayError::internal("ObjectStore not found in app data"))
    }

    // Handle file upload
    pub async fn handle_upload(
        &self,
        request: &HttpRequest,
        payload: Multipart,
    ) -> ActixResult<HttpResponse> {
        upload::handle_upload(self, request, payload).await
    }

    // Handle file download
    pub async fn handle_download(
        &self,
        request: &HttpRequest,
        code: &str,
    ) -> ActixResult<HttpResponse> {
        download::handle_download(self, request, code).await
    }

    // Handle metadata query
    pub async fn handle_info(&self, request: &HttpRequest, code: &str) -> ActixResult<HttpResponse> {
        info::handle_info(self, request, code).await
    }
}
