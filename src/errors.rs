//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称，
//! 并在请求边界统一转换为 HTTP 状态码。

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use std::fmt;

use crate::models::{ApiResponse, ErrorCode};

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_relay_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum RelayError {
            $($variant(String),)*
        }

        impl RelayError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(RelayError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(RelayError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(RelayError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl RelayError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        RelayError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_relay_errors! {
    Validation("E001", "Validation Error"),
    PayloadTooLarge("E002", "Payload Too Large"),
    NotFound("E003", "Resource Not Found"),
    Expired("E004", "Code Expired"),
    IntegrityFailed("E005", "Integrity Check Failed"),
    RateLimited("E006", "Rate Limit Exceeded"),
    FileOperation("E007", "File Operation Error"),
    Internal("E008", "Internal Error"),
}

impl RelayError {
    /// 对应的业务错误码
    pub fn error_code(&self) -> ErrorCode {
        match self {
            RelayError::Validation(_) => ErrorCode::BadRequest,
            RelayError::PayloadTooLarge(_) => ErrorCode::FileSizeExceeded,
            RelayError::NotFound(_) => ErrorCode::CodeNotFound,
            RelayError::Expired(_) => ErrorCode::CodeExpired,
            RelayError::IntegrityFailed(_) => ErrorCode::IntegrityCheckFailed,
            RelayError::RateLimited(_) => ErrorCode::RateLimitExceeded,
            RelayError::FileOperation(_) | RelayError::Internal(_) => {
                ErrorCode::InternalServerError
            }
        }
    }

    /// 是否为内部错误（详情只写日志，不返回给客户端）
    pub fn is_internal(&self) -> bool {
        matches!(self, RelayError::FileOperation(_) | RelayError::Internal(_))
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for RelayError {}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            RelayError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Expired(_) => StatusCode::GONE,
            RelayError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            RelayError::IntegrityFailed(_)
            | RelayError::FileOperation(_)
            | RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            tracing::error!("{}", self);
            "Internal server error"
        } else {
            self.message()
        };
        HttpResponse::build(self.status_code())
            .json(ApiResponse::error_empty(self.error_code(), message))
    }
}

// 为常见的错误类型实现 From trait
impl From<std::io::Error> for RelayError {
    fn from(err: std::io::Error) -> Self {
        RelayError::FileOperation(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for RelayError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        RelayError::Validation(format!("Malformed multipart body: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
