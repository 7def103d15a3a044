use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;

use super::FileService;
use crate::models::files::responses::FileInfoResponse;
use crate::utils::normalize_code;

pub async fn handle_info(
    service: &FileService,
    request: &HttpRequest,
    code: &str,
) -> ActixResult<HttpResponse> {
    let store = service.get_store(request)?;
    let code = normalize_code(code);

    let object = store.get(&code).await?;

    Ok(HttpResponse::Ok().json(FileInfoResponse::from_object(object, Utc::now())))
}
