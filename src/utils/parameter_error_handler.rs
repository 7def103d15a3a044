use actix_web::{HttpRequest, HttpResponse, error::InternalError, error::JsonPayloadError};

use crate::models::{ApiResponse, ErrorCode};

/// JSON 请求体解析失败时返回 400
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = format!("Invalid JSON body: {err}");
    tracing::debug!("{}", message);
    let response =
        HttpResponse::BadRequest().json(ApiResponse::error_empty(ErrorCode::BadRequest, message));
    InternalError::from_response(err, response).into()
}
