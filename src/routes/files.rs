use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::middlewares;
use crate::models::files::requests::DownloadRequest;
use crate::services::FileService;

// 懒加载的全局 FileService 实例
static FILE_SERVICE: Lazy<FileService> = Lazy::new(FileService::new_lazy);

pub async fn handle_upload(
    request: HttpRequest,
    payload: actix_multipart::Multipart,
) -> ActixResult<HttpResponse> {
    FILE_SERVICE.handle_upload(&request, payload).await
}

pub async fn handle_download_by_body(
    request: HttpRequest,
    body: web::Json<DownloadRequest>,
) -> ActixResult<HttpResponse> {
    FILE_SERVICE.handle_download(&request, &body.code).await
}

pub async fn handle_download(
    request: HttpRequest,
    code: web::Path<String>,
) -> ActixResult<HttpResponse> {
    FILE_SERVICE.handle_download(&request, &code).await
}

pub async fn handle_info(
    request: HttpRequest,
    code: web::Path<String>,
) -> ActixResult<HttpResponse> {
    FILE_SERVICE.handle_info(&request, &code).await
}

// 配置路由：所有端点共享同一个按 IP 的配额
pub fn configure_file_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/upload")
            .wrap(middlewares::RateLimit)
            .route(web::post().to(handle_upload)),
    )
    .service(
        web::resource("/download")
            .wrap(middlewares::RateLimit)
            .route(web::post().to(handle_download_by_body)),
    )
    .service(
        web::resource("/download/{code}")
            .wrap(middlewares::RateLimit)
            .route(web::get().to(handle_download)),
    )
    .service(
        web::resource("/info/{code}")
            .wrap(middlewares::RateLimit)
            .route(web::get().to(handle_info)),
    );
}
