use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// 验证码取值范围（六位数字）
const OTP_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// 生成六位数字验证码
pub fn generate_otp() -> String {
    rand::rng().random_range(OTP_RANGE).to_string()
}

/// 验证码过期时间
pub fn expires_at(now: DateTime<Utc>, ttl_seconds: i64) -> DateTime<Utc> {
    now + Duration::seconds(ttl_seconds)
}

/// 验证码检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// 尚未发送验证码
    Missing,
    /// 已过期
    Expired,
    /// 验证码不匹配
    Mismatch,
    Valid,
}

impl OtpCheck {
    /// 对外的错误消息
    pub fn message(&self) -> &'static str {
        match self {
            OtpCheck::Missing => "OTP not sent. Please request a new OTP.",
            OtpCheck::Expired => "OTP expired. Please request a new OTP.",
            OtpCheck::Mismatch => "Invalid OTP code",
            OtpCheck::Valid => "OTP is valid",
        }
    }
}

/// 按 发送 -> 过期 -> 匹配 的顺序检查验证码
pub fn check_otp(
    stored: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    submitted: &str,
    now: DateTime<Utc>,
) -> OtpCheck {
    let (Some(stored), Some(expires_at)) = (stored, expires_at) else {
        return OtpCheck::Missing;
    };

    if now > expires_at {
        return OtpCheck::Expired;
    }

    if stored != submitted.trim() {
        return OtpCheck::Mismatch;
    }

    OtpCheck::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_is_six_digits() {
        for _ in 0..200 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!(OTP_RANGE.contains(&value));
        }
    }

    #[test]
    fn test_check_otp_order() {
        let now = Utc::now();
        let later = expires_at(now, 120);

        assert_eq!(check_otp(None, None, "123456", now), OtpCheck::Missing);
        assert_eq!(
            check_otp(Some("123456"), None, "123456", now),
            OtpCheck::Missing
        );
        assert_eq!(
            check_otp(Some("123456"), Some(later), "654321", now),
            OtpCheck::Mismatch
        );
        assert_eq!(
            check_otp(Some("123456"), Some(later), "123456", now),
            OtpCheck::Valid
        );
    }

    #[test]
    fn test_check_otp_after_expiry() {
        let issued = Utc::now();
        let expiry = expires_at(issued, 120);

        // 过期优先于匹配检查
        let after = issued + Duration::seconds(121);
        assert_eq!(
            check_otp(Some("123456"), Some(expiry), "123456", after),
            OtpCheck::Expired
        );
        assert_eq!(
            check_otp(Some("123456"), Some(expiry), "000000", after),
            OtpCheck::Expired
        );
        // 到期时刻本身仍然有效
        assert_eq!(
            check_otp(Some("123456"), Some(expiry), "123456", expiry),
            OtpCheck::Valid
        );
        assert_eq!(
            check_otp(
                Some("123456"),
                Some(expiry),
                "123456",
                expiry + Duration::milliseconds(1)
            ),
            OtpCheck::Expired
        );
    }

    #[test]
    fn test_submitted_code_is_trimmed() {
        let now = Utc::now();
        assert_eq!(
            check_otp(Some("123456"), Some(expires_at(now, 60)), " 123456 ", now),
            OtpCheck::Valid
        );
    }
}
