use actix_web::dev::ServiceRequest;
use actix_web::http::header::HeaderMap;
use std::net::{IpAddr, SocketAddr};

/// 从请求中提取客户端 IP，作为限流键
///
/// 安全注意事项：
/// - 默认只使用套接字对端地址
/// - 仅当服务部署在反向代理后面并开启 `trust_proxy_headers` 时才读取转发头，
///   否则攻击者可以伪造 X-Forwarded-For 绕过限制
pub fn extract_client_ip(req: &ServiceRequest, trust_proxy_headers: bool) -> String {
    resolve_client_ip(req.peer_addr(), req.headers(), trust_proxy_headers)
}

pub(crate) fn resolve_client_ip(
    peer: Option<SocketAddr>,
    headers: &HeaderMap,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        // 只取第一个 IP（最接近客户端的）
        if let Some(forwarded) = headers.get("X-Forwarded-For")
            && let Ok(value) = forwarded.to_str()
            && let Some(ip) = value.split(',').next()
            && let Some(ip) = parse_ip(ip)
        {
            return ip.to_string();
        }

        if let Some(real_ip) = headers.get("X-Real-IP")
            && let Ok(value) = real_ip.to_str()
            && let Some(ip) = parse_ip(value)
        {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse::<IpAddr>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::header::{HeaderName, HeaderValue};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_peer_address_by_default() {
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let map = headers(&[("x-forwarded-for", "1.2.3.4")]);
        assert_eq!(resolve_client_ip(Some(peer), &map, false), "10.0.0.7");
    }

    #[test]
    fn test_forwarded_for_when_trusted() {
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let map = headers(&[("x-forwarded-for", " 1.2.3.4 , 10.0.0.1")]);
        assert_eq!(resolve_client_ip(Some(peer), &map, true), "1.2.3.4");
    }

    #[test]
    fn test_invalid_forwarded_falls_back() {
        let peer: SocketAddr = "10.0.0.7:51000".parse().unwrap();
        let map = headers(&[("x-forwarded-for", "not-an-ip"), ("x-real-ip", "5.6.7.8")]);
        assert_eq!(resolve_client_ip(Some(peer), &map, true), "5.6.7.8");

        let map = headers(&[("x-forwarded-for", "garbage")]);
        assert_eq!(resolve_client_ip(Some(peer), &map, true), "10.0.0.7");
    }

    #[test]
    fn test_unknown_without_peer() {
        assert_eq!(resolve_client_ip(None, &HeaderMap::new(), false), "unknown");
    }
}
