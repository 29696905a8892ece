// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::borrow::Cow;

use crate::TenderStatus;

/// Colour family used for a status badge or its dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTone {
    Green,
    Blue,
    Yellow,
    Purple,
    Red,
    Neutral,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMeta {
    pub label: Cow<'static, str>,
    pub badge: StatusTone,
    pub dot: StatusTone,
}

pub fn status_meta(status: &TenderStatus) -> StatusMeta {
    let (label, tone) = match status {
        TenderStatus::Bidding => ("accepting bids", StatusTone::Green),
        TenderStatus::New => ("new", StatusTone::Blue),
        TenderStatus::Evaluated => ("under evaluation", StatusTone::Yellow),
        TenderStatus::Finished => ("finished", StatusTone::Purple),
        TenderStatus::Cancelled => ("cancelled", StatusTone::Red),
        TenderStatus::Unknown(code) => {
            return StatusMeta {
                label: Cow::Owned(code.clone()),
                badge: StatusTone::Neutral,
                dot: StatusTone::Muted,
            };
        }
    };
    StatusMeta {
        label: Cow::Borrowed(label),
        badge: tone,
        dot: tone,
    }
}
