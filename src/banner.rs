use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Festival {
    pub month: u32,
    pub day: u32,
    pub name: &'static str,
    pub icon: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpactMessage {
    pub icon: &'static str,
    pub heading: &'static str,
    pub text: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Festival,
    Mission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerContent {
    pub kind: BannerKind,
    pub icon: &'static str,
    pub heading: &'static str,
    pub text: &'static str,
}

pub const FESTIVALS: &[Festival] = &[
    Festival { month: 1, day: 14, name: "Happy Bhogi", icon: "🔥", message: "May the flames of Bhogi burn away your worries!" },
    Festival { month: 1, day: 15, name: "Happy Pongal", icon: "🌾", message: "Harvesting joy and prosperity this Pongal!" },
    Festival { month: 1, day: 16, name: "Happy Mattu Pongal", icon: "🐄", message: "Celebrating our cattle and harvest!" },
    Festival { month: 1, day: 17, name: "Happy Kaanum Pongal", icon: "🏖️", message: "Cherishing family bonds this Kaanum Pongal!" },
    Festival { month: 3, day: 19, name: "Happy Ugadi", icon: "🌿", message: "New beginnings, new aspirations!" },
    Festival { month: 4, day: 14, name: "Happy Vishu / Tamil New Year", icon: "🌼", message: "Wishing you prosperity and new beginnings!" },
    Festival { month: 8, day: 25, name: "Happy Onam", icon: "🌸", message: "Celebrating abundance and togetherness!" },
    Festival { month: 10, day: 20, name: "Happy Dussehra", icon: "🏹", message: "Celebrating the triumph of good over evil." },
    Festival { month: 11, day: 8, name: "Happy Diwali", icon: "🪔", message: "Lighting up lives with hope and innovation!" },
];

pub const IMPACT_MESSAGES: &[ImpactMessage] = &[
    ImpactMessage { icon: "🚀", heading: "Our Mission", text: "AI for Social Impact: Bridging gaps, building futures." },
    ImpactMessage { icon: "💡", heading: "Innovation", text: "Innovating for India's next billion users." },
    ImpactMessage { icon: "🤝", heading: "Community", text: "Technology + Empathy = Sustainable Change." },
    ImpactMessage { icon: "🌍", heading: "Empowerment", text: "Empowering rural communities through intelligent solutions." },
    ImpactMessage { icon: "🌱", heading: "Growth", text: "Cultivating talent, harvesting innovation." },
];

pub fn festival_for(date: NaiveDate) -> Option<&'static Festival> {
    FESTIVALS
        .iter()
        .find(|festival| festival.month == date.month() && festival.day == date.day())
}

/// Promotional banner. A festival greeting stays put for the whole day;
/// otherwise impact messages rotate. Dismissal lasts for the session only.
#[derive(Debug, Clone)]
pub struct Banner {
    festival: Option<&'static Festival>,
    index: usize,
    rotate_every: Duration,
    last_rotate: Instant,
    dismissed: bool,
}

impl Banner {
    pub fn new(today: NaiveDate, rotate_every: Duration) -> Self {
        let start = rand::thread_rng().gen_range(0..IMPACT_MESSAGES.len());
        Self::with_start(today, rotate_every, start)
    }

    pub fn with_start(today: NaiveDate, rotate_every: Duration, start: usize) -> Self {
        Self {
            festival: festival_for(today),
            index: start % IMPACT_MESSAGES.len(),
            rotate_every,
            last_rotate: Instant::now(),
            dismissed: false,
        }
    }

    pub fn current(&self) -> Option<BannerContent> {
        if self.dismissed {
            return None;
        }
        if let Some(festival) = self.festival {
            return Some(BannerContent {
                kind: BannerKind::Festival,
                icon: festival.icon,
                heading: festival.name,
                text: festival.message,
            });
        }
        let impact = &IMPACT_MESSAGES[self.index];
        Some(BannerContent {
            kind: BannerKind::Mission,
            icon: impact.icon,
            heading: impact.heading,
            text: impact.text,
        })
    }

    /// Advances the mission rotation when the interval has elapsed. Returns
    /// true when the visible content changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.dismissed || self.festival.is_some() || self.rotate_every.is_zero() {
            return false;
        }
        if now.saturating_duration_since(self.last_rotate) < self.rotate_every {
            return false;
        }
        self.last_rotate = now;
        self.index = (self.index + 1) % IMPACT_MESSAGES.len();
        true
    }

    pub fn dismiss(&mut self) {
        self.dismissed = true;
    }

    pub fn is_dismissed(&self) -> bool {
        self.dismissed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    #[test]
    fn festival_day_shows_greeting() {
        let banner = Banner::with_start(date(11, 8), Duration::from_secs(8), 0);
        let content = banner.current().unwrap();
        assert_eq!(content.kind, BannerKind::Festival);
        assert_eq!(content.heading, "Happy Diwali");
    }

    #[test]
    fn ordinary_day_shows_mission_message() {
        let banner = Banner::with_start(date(6, 1), Duration::from_secs(8), 2);
        let content = banner.current().unwrap();
        assert_eq!(content.kind, BannerKind::Mission);
        assert_eq!(content.heading, "Community");
    }

    #[test]
    fn rotation_waits_for_interval_and_wraps() {
        let mut banner = Banner::with_start(date(6, 1), Duration::from_secs(8), 4);
        let start = Instant::now();
        assert!(!banner.tick(start));
        assert!(banner.tick(start + Duration::from_secs(9)));
        assert_eq!(banner.current().unwrap().heading, "Our Mission");
    }

    #[test]
    fn festival_does_not_rotate() {
        let mut banner = Banner::with_start(date(1, 15), Duration::from_secs(1), 0);
        assert!(!banner.tick(Instant::now() + Duration::from_secs(60)));
        assert_eq!(banner.current().unwrap().heading, "Happy Pongal");
    }

    #[test]
    fn dismissed_banner_is_hidden() {
        let mut banner = Banner::new(date(6, 1), Duration::from_secs(8));
        assert!(banner.current().is_some());
        banner.dismiss();
        assert!(banner.is_dismissed());
        assert!(banner.current().is_none());
        assert!(!banner.tick(Instant::now() + Duration::from_secs(60)));
    }
}
