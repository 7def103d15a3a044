use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, middleware, web};
use once_cell::sync::Lazy;

use crate::services::SystemService;

// 懒加载的全局 SystemService 实例
static SYSTEM_SERVICE: Lazy<SystemService> = Lazy::new(SystemService::new_lazy);

pub async fn health(request: HttpRequest) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.health(&request).await
}

// 配置路由（不限流）
pub fn configure_system_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/health")
            .wrap(middleware::Compress::default())
            .route(web::get().to(health)),
    );
}
