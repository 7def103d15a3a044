/// 业务错误码，随 `ApiResponse.code` 一同返回
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // 请求错误
    BadRequest = 1000,
    FileSizeExceeded = 1001,

    // 取件码相关
    CodeNotFound = 2000,
    CodeExpired = 2001,

    // 完整性
    IntegrityCheckFailed = 3000,

    // 限流
    RateLimitExceeded = 4290,

    InternalServerError = 5000,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::BadRequest as i32, 1000);
        assert_eq!(ErrorCode::CodeExpired as i32, 2001);
        assert_eq!(ErrorCode::RateLimitExceeded as i32, 4290);
    }
}
