use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    expires_at: Option<Instant>,
}

impl Banner {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// One visible banner at a time. Success banners expire on their own; error
/// banners stay until dismissed or replaced by a success.
#[derive(Debug, Clone, Default)]
pub struct BannerSlot {
    current: Option<Banner>,
}

impl BannerSlot {
    pub fn success(&mut self, message: impl Into<String>, ttl: Duration, now: Instant) {
        self.current = Some(Banner {
            kind: BannerKind::Success,
            message: message.into(),
            expires_at: Some(now + ttl),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.current = Some(Banner {
            kind: BannerKind::Error,
            message: message.into(),
            expires_at: None,
        });
    }

    pub fn active(&self, now: Instant) -> Option<&Banner> {
        self.current.as_ref().filter(|b| !b.is_expired(now))
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_banner_expires() {
        let now = Instant::now();
        let mut slot = BannerSlot::default();
        slot.success("Saved", Duration::from_secs(3), now);

        assert_eq!(slot.active(now).map(|b| b.kind), Some(BannerKind::Success));
        assert!(slot.active(now + Duration::from_millis(2999)).is_some());
        assert!(slot.active(now + Duration::from_secs(3)).is_none());
    }

    #[test]
    fn test_error_banner_persists_until_success_or_dismiss() {
        let now = Instant::now();
        let mut slot = BannerSlot::default();
        slot.error("Connection error");
        assert!(slot.active(now + Duration::from_secs(3600)).is_some());

        slot.success("Done", Duration::from_secs(3), now);
        assert_eq!(slot.active(now).map(|b| b.message.as_str()), Some("Done"));

        slot.error("Again");
        slot.dismiss();
        assert!(slot.active(now).is_none());
    }
}
