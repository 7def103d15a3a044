/*!
 * 速率限制中间件
 *
 * 按客户端 IP 做滑动窗口限流，所有被包裹的端点共享同一个配额。
 *
 * ## 使用方法
 *
 * ```rust,ignore
 * use actix_web::{web, App};
 * use crate::middlewares::RateLimit;
 *
 * App::new()
 *     .app_data(web::Data::new(RateLimiter::new(5, Duration::from_secs(60))))
 *     .service(
 *         web::resource("/upload")
 *             .wrap(RateLimit)
 *             .route(web::post().to(upload_handler)),
 *     )
 * ```
 *
 * ## 限制规则
 *
 * - 使用客户端 IP 作为限制键（见 `utils::client_ip`）
 * - 超过限制返回 429 Too Many Requests，并附带 Retry-After
 */

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpResponse, ResponseError,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue, RETRY_AFTER},
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use crate::cache::{Admission, RateLimiter};
use crate::errors::RelayError;
use crate::utils::extract_client_ip;

/// 是否信任代理转发头，作为 app_data 注册；未注册时视为不信任
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustProxyHeaders(pub bool);

/// 速率限制中间件，限流器从 app_data 中获取
#[derive(Clone, Copy, Default)]
pub struct RateLimit;

/// 创建速率限制错误响应
fn create_rate_limit_response(retry_after: Duration) -> HttpResponse {
    // 向上取整，至少 1 秒
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    let secs = secs.max(1);

    let mut response = RelayError::rate_limited("Too many requests from this IP").error_response();
    let headers = response.headers_mut();
    headers.insert(RETRY_AFTER, HeaderValue::from(secs));
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from_static("0"),
    );
    response
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();

        Box::pin(async move {
            let Some(limiter) = req.app_data::<web::Data<RateLimiter>>().cloned() else {
                error!("RateLimiter not registered in app data");
                let err = RelayError::internal("Rate limiter unavailable");
                return Ok(req.error_response(err).map_into_right_body());
            };
            let trust_proxy_headers = req
                .app_data::<web::Data<TrustProxyHeaders>>()
                .map(|flag| flag.0)
                .unwrap_or_default();

            let client_id = extract_client_ip(&req, trust_proxy_headers);

            match limiter.admit(&client_id, Instant::now()) {
                Admission::Allowed { remaining } => {
                    debug!(client = %client_id, remaining, "Request admitted");
                }
                Admission::Rejected { retry_after } => {
                    warn!(
                        "Rate limit exceeded for client: {} (limit: {}/{}s)",
                        client_id,
                        limiter.max_requests(),
                        limiter.window().as_secs()
                    );
                    return Ok(req
                        .into_response(create_rate_limit_response(retry_after).map_into_right_body()));
                }
            }

            // 继续处理请求
            let res = srv.call(req).await?.map_into_left_body();
            Ok(res)
        })
    }
}
