//! 按客户端的滑动窗口限流
//!
//! 每个客户端保存窗口内的请求时间戳。每次检查先剔除窗口外的记录，
//! 未达上限才记录本次请求；被拒绝的请求不计数。

use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        /// 本窗口剩余可用次数
        remaining: usize,
    },
    Rejected {
        /// 最早一条记录离开窗口还需等待的时间
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

pub struct RateLimiter {
    windows: DashMap<String, VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 判定一次请求是否放行
    pub fn admit(&self, client_id: &str, now: Instant) -> Admission {
        let mut entry = self.windows.entry(client_id.to_owned()).or_default();
        let timestamps = entry.value_mut();

        while let Some(&oldest) = timestamps.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                timestamps.pop_front();
            } else {
                break;
            }
        }

        if timestamps.len() >= self.max_requests {
            let retry_after = timestamps
                .front()
                .map(|&oldest| self.window.saturating_sub(now.saturating_duration_since(oldest)))
                .unwrap_or(self.window);
            return Admission::Rejected { retry_after };
        }

        timestamps.push_back(now);
        Admission::Allowed {
            remaining: self.max_requests - timestamps.len(),
        }
    }

    /// 移除整个窗口内都没有请求的客户端，返回移除数量
    pub fn prune_idle(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            timestamps
                .back()
                .is_some_and(|&latest| now.saturating_duration_since(latest) < self.window)
        });
        before.saturating_sub(self.windows.len())
    }

    /// 当前跟踪的客户端数
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(60);

    #[test]
    fn test_exactly_n_admits_per_window() {
        let limiter = RateLimiter::new(5, WINDOW);
        let start = Instant::now();

        for i in 0..5 {
            let now = start + Duration::from_secs(i);
            assert_eq!(
                limiter.admit("10.0.0.1", now),
                Admission::Allowed {
                    remaining: 4 - i as usize
                }
            );
        }

        let sixth = limiter.admit("10.0.0.1", start + Duration::from_secs(10));
        assert_eq!(
            sixth,
            Admission::Rejected {
                retry_after: Duration::from_secs(50)
            }
        );
    }

    #[test]
    fn test_rejections_are_not_recorded() {
        let limiter = RateLimiter::new(1, WINDOW);
        let start = Instant::now();

        assert!(limiter.admit("c", start).is_allowed());
        for s in 1..30 {
            assert!(!limiter.admit("c", start + Duration::from_secs(s)).is_allowed());
        }
        // 只有第一次请求占用窗口，60 秒后即可再次放行
        assert!(limiter.admit("c", start + WINDOW).is_allowed());
    }

    #[test]
    fn test_window_rolls() {
        let limiter = RateLimiter::new(2, WINDOW);
        let start = Instant::now();

        assert!(limiter.admit("c", start).is_allowed());
        assert!(limiter.admit("c", start + Duration::from_secs(30)).is_allowed());
        assert!(!limiter.admit("c", start + Duration::from_secs(59)).is_allowed());
        // 第一条记录离开窗口，腾出一个名额
        assert!(limiter.admit("c", start + Duration::from_secs(60)).is_allowed());
        assert!(!limiter.admit("c", start + Duration::from_secs(61)).is_allowed());
    }

    #[test]
    fn test_full_reset_after_quiet_window() {
        let limiter = RateLimiter::new(3, WINDOW);
        let start = Instant::now();
        for _ in 0..3 {
            assert!(limiter.admit("c", start).is_allowed());
        }
        assert!(!limiter.admit("c", start).is_allowed());

        let later = start + WINDOW;
        for _ in 0..3 {
            assert!(limiter.admit("c", later).is_allowed());
        }
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, WINDOW);
        let now = Instant::now();
        assert!(limiter.admit("a", now).is_allowed());
        assert!(!limiter.admit("a", now).is_allowed());
        assert!(limiter.admit("b", now).is_allowed());
    }

    #[test]
    fn test_prune_idle_clients() {
        let limiter = RateLimiter::new(5, WINDOW);
        let start = Instant::now();
        limiter.admit("idle", start);
        limiter.admit("active", start + Duration::from_secs(50));
        assert_eq!(limiter.tracked_clients(), 2);

        assert_eq!(limiter.prune_idle(start + Duration::from_secs(70)), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.admit("active", start + Duration::from_secs(71)).is_allowed());
    }
}
