// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use tenderboard_app::{ProductId, Tender, TenderId, TenderStatus, TenderUser, UserId};
use time::format_description::well_known::Rfc3339;
use time::macros::{datetime, offset};
use time::{Duration, OffsetDateTime};

const COMMODITIES: [&str; 14] = [
    "Diesel fuel",
    "AI-92 gasoline",
    "AI-95 gasoline",
    "Liquefied petroleum gas",
    "Engine oil",
    "Fuel dispensers",
    "Storage tank coating",
    "Pipeline valves",
    "Fire suppression systems",
    "Tanker truck tyres",
    "Station canopy lighting",
    "Lab reagents",
    "Security services",
    "IT equipment",
];

const TENDER_KINDS: [&str; 6] = [
    "supply",
    "delivery",
    "maintenance",
    "installation",
    "inspection",
    "framework agreement",
];

const SITES: [&str; 8] = [
    "Bishkek depot",
    "Osh terminal",
    "Kara-Balta station",
    "Tokmok station",
    "Jalal-Abad depot",
    "Naryn station",
    "Talas station",
    "Cholpon-Ata station",
];

const TERMS: [&str; 5] = [
    "Delivery within 30 days of contract signature",
    "Payment 50% upfront, 50% on acceptance",
    "Certificates of conformity required",
    "Warranty of at least 12 months",
    "Prices in KGS including VAT",
];

const CLOSE_REASONS: [&str; 4] = [
    "No compliant bids received",
    "Budget withdrawn",
    "Requirements revised",
    "Contract awarded",
];

const FIRST_NAMES: [&str; 10] = [
    "Aida", "Bakyt", "Cholpon", "Daniyar", "Elnura", "Azamat", "Gulnara", "Nurlan", "Aizhan",
    "Timur",
];
const LAST_NAMES: [&str; 10] = [
    "Sadykova",
    "Abdyldaev",
    "Toktogulova",
    "Asanov",
    "Mamytova",
    "Bekov",
    "Usenova",
    "Alymbekov",
    "Kadyrova",
    "Ismailov",
];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible tenders for tests and demo mode.
#[derive(Debug, Clone)]
pub struct TenderFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl TenderFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn tender(&mut self) -> Tender {
        let status = TenderStatus::KNOWN[self.rng.int_n(TenderStatus::KNOWN.len())].clone();
        self.tender_with_status(status)
    }

    pub fn tender_with_status(&mut self, status: TenderStatus) -> Tender {
        let id = self.next_id;
        self.next_id += 1;

        let commodity = self.pick(&COMMODITIES);
        let kind = self.pick(&TENDER_KINDS);
        let site = self.pick(&SITES);
        let created_at = reference_now() - Duration::hours(self.int_range(2, 24 * 60));
        let end_date = created_at + Duration::days(self.int_range(7, 45));
        let updated_at = created_at + Duration::hours(self.int_range(0, 72));
        let products = (0..self.int_range(1, 4))
            .map(|offset| ProductId::new(100 + id * 10 + offset))
            .collect::<Vec<_>>();

        let close_reason = match status {
            TenderStatus::Cancelled | TenderStatus::Finished => {
                Some(self.pick(&CLOSE_REASONS).to_owned())
            }
            _ => None,
        };
        let terms = self.rng.bool().then(|| self.pick(&TERMS).to_owned());
        let bids_count = match status {
            TenderStatus::New => 0,
            _ => self.int_range(0, 12),
        };

        Tender {
            id: TenderId::new(id),
            name: format!("{commodity} {kind}"),
            description: format!("{commodity} {kind} for the {site}."),
            terms,
            end_date: rfc3339(end_date),
            created_by: self.user(),
            status,
            close_reason,
            products_count: products.len() as i64,
            products,
            created_at: rfc3339(created_at),
            updated_at: rfc3339(updated_at),
            bids_count,
        }
    }

    pub fn tenders(&mut self, count: usize) -> Vec<Tender> {
        (0..count).map(|_| self.tender()).collect()
    }

    fn user(&mut self) -> TenderUser {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        TenderUser {
            id: UserId::new(self.int_range(1, 40)),
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: format!("{}.{}@redpetroleum.kg", first, last).to_ascii_lowercase(),
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// Minimal tender for table-driven tests.
pub fn tender(id: i64, name: &str, status: TenderStatus, created_at: &str) -> Tender {
    Tender {
        id: TenderId::new(id),
        name: name.to_owned(),
        description: format!("{name} description"),
        status,
        created_at: created_at.to_owned(),
        ..Tender::default()
    }
}

/// The demo list served by `--demo`, one tender per known status first.
pub fn demo_tenders() -> Vec<Tender> {
    let mut faker = TenderFaker::new(2026);
    let mut tenders = TenderStatus::KNOWN
        .iter()
        .map(|status| faker.tender_with_status(status.clone()))
        .collect::<Vec<_>>();
    tenders.extend(faker.tenders(7));
    tenders
}

pub fn tenders_json(tenders: &[Tender]) -> Result<String> {
    serde_json::to_string(tenders).context("encode tenders")
}

fn reference_now() -> OffsetDateTime {
    datetime!(2026-02-15 12:00 +06:00)
}

fn rfc3339(value: OffsetDateTime) -> String {
    value
        .to_offset(offset!(+6))
        .format(&Rfc3339)
        .unwrap_or_default()
}
