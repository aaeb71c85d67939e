use crate::dto::HealthRes;

/// Liveness report shared by every HTTP entry point.
pub fn check_health() -> HealthRes {
    HealthRes {
        ok: true,
        message: "Medical Records Bridge is alive".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_health_reports_ok() {
        let res = check_health();
        assert!(res.ok);
        assert!(res.message.contains("alive"));
    }
}
