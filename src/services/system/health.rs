use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};

use crate::models::system::responses::HealthResponse;
use crate::storage::ObjectStore;

pub async fn health(request: &HttpRequest) -> ActixResult<HttpResponse> {
    let active_files = match request.app_data::<web::Data<ObjectStore>>() {
        Some(store) => store.len().await,
        None => 0,
    };

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        active_files,
        timestamp: chrono::Utc::now(),
    }))
}
