// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use std::path::PathBuf;
use time::macros::date;
use time::{Date, Duration};
use urgentboard_app::{ItemDraft, OrderType};

const MATERIALS: [(&str, &str); 16] = [
    ("100-2040", "Gasket, spiral wound 2in"),
    ("100-2210", "Bearing, deep groove 6204"),
    ("110-0034", "Seal kit, hydraulic cylinder"),
    ("120-7781", "Filter element, 10 micron"),
    ("130-5512", "Fuse, 32A ceramic"),
    ("140-0098", "Contactor, 3 pole 24VDC"),
    ("150-4410", "Valve, ball 1/2in stainless"),
    ("160-0301", "Cable, shielded 4 core"),
    ("170-2288", "Coupling, jaw type L100"),
    ("180-6620", "Sensor, inductive proximity"),
    ("190-1175", "Belt, V-section SPA 1250"),
    ("200-3349", "Relay, safety 2NO"),
    ("210-0007", "Pump, diaphragm dosing"),
    ("220-9010", "Fastener kit, M8 A4"),
    ("230-4466", "Hose, hydraulic 3/8in 2m"),
    ("240-8802", "Encoder, incremental 1024ppr"),
];

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Rowan", "Hayden",
];
const LAST_NAMES: [&str; 12] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Turner", "Brooks",
];

const SUPPLIERS: [&str; 8] = [
    "Apex Industrial",
    "Central Bearings",
    "Summit Hydraulics",
    "Reliable Electric Supply",
    "Heritage Fluid Power",
    "Eagle Fasteners",
    "Bright Automation",
    "Greenleaf Components",
];

const LOCATIONS: [&str; 8] = [
    "Stores counter",
    "Line 1 workshop",
    "Line 2 workshop",
    "Boiler house",
    "Packing hall",
    "Maintenance office",
    "Despatch bay",
    "Tool room",
];

const COMMENTS: [&str; 8] = [
    "",
    "Breakdown spare",
    "Call on arrival",
    "Needed before shutdown",
    "Partial delivery ok",
    "Check alternate part",
    "",
    "Expedite with supplier",
];

const ORDER_TYPES: [OrderType; 4] = [
    OrderType::None,
    OrderType::Purchase,
    OrderType::Sales,
    OrderType::Production,
];

/// First day of the window fake due dates are drawn from.
pub const REFERENCE_DATE: Date = date!(2026 - 01 - 05);

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

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

/// Seeded generator of plausible urgent-demand items.
#[derive(Debug, Clone)]
pub struct ItemFaker {
    rng: DeterministicRng,
}

impl ItemFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn item_draft(&mut self) -> ItemDraft {
        let (material, description) = MATERIALS[self.rng.int_n(MATERIALS.len())];
        let order_type = ORDER_TYPES[self.rng.int_n(ORDER_TYPES.len())];
        let (object_key, line) = match order_type {
            OrderType::None => (String::new(), String::new()),
            _ => (
                format!("{}", 4_500_000 + self.rng.int_n(90_000)),
                format!("{}", (self.rng.int_n(8) + 1) * 10),
            ),
        };
        let unlimited_quantity = self.rng.chance(10);
        let quantity = (!unlimited_quantity).then(|| self.rng.int_n(24) as i64 + 1);
        let quantity_issued = match quantity {
            Some(required) if self.rng.chance(30) => self.rng.int_n(required as usize) as i64,
            _ => 0,
        };

        ItemDraft {
            material: material.to_owned(),
            description: description.to_owned(),
            order_type,
            object_key,
            line,
            quantity,
            unlimited_quantity,
            quantity_issued,
            uom: "EA".to_owned(),
            due_date: Some(self.due_date()),
            deliver_to: self.pick(&LOCATIONS).to_owned(),
            comments: self.pick(&COMMENTS).to_owned(),
            entered_by_name: self.contact_name(),
            supplier_name: self.pick(&SUPPLIERS).to_owned(),
        }
    }

    pub fn item_drafts(&mut self, count: usize) -> Vec<ItemDraft> {
        (0..count).map(|_| self.item_draft()).collect()
    }

    /// Within six weeks of [`REFERENCE_DATE`].
    pub fn due_date(&mut self) -> Date {
        REFERENCE_DATE + Duration::days(self.rng.int_n(42) as i64)
    }

    pub fn contact_name(&mut self) -> String {
        format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES))
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("urgentboard.db");
    Ok((dir, db_path))
}

/// A fixed, valid draft for tests that need exact values.
pub fn fixture_draft(material: &str, description: &str) -> ItemDraft {
    ItemDraft {
        material: material.to_owned(),
        description: description.to_owned(),
        quantity: Some(1),
        due_date: Some(REFERENCE_DATE),
        entered_by_name: "Avery Walker".to_owned(),
        ..ItemDraft::blank()
    }
}

pub fn materials() -> impl Iterator<Item = &'static str> {
    MATERIALS.iter().map(|(material, _)| *material)
}
