// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::{Date, UtcOffset};

use crate::{Tender, TenderStatus, parse_timestamp, same_calendar_day};

/// Client-side filter inputs. An empty field leaves the list untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FilterState {
    pub search_query: String,
    pub status: Option<TenderStatus>,
    pub date: Option<Date>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.normalized_query().is_none() && self.status.is_none() && self.date.is_none()
    }

    pub fn normalized_query(&self) -> Option<String> {
        let trimmed = self.search_query.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        }
    }
}

/// Returns the tenders matching every active filter, in source order.
pub fn filter_tenders<'a>(
    tenders: &'a [Tender],
    filters: &FilterState,
    offset: UtcOffset,
) -> Vec<&'a Tender> {
    filter_indices(tenders, filters, offset)
        .into_iter()
        .map(|index| &tenders[index])
        .collect()
}

pub fn filter_indices(tenders: &[Tender], filters: &FilterState, offset: UtcOffset) -> Vec<usize> {
    let query = filters.normalized_query();
    tenders
        .iter()
        .enumerate()
        .filter(|(_, tender)| {
            query
                .as_deref()
                .is_none_or(|query| matches_query(tender, query))
        })
        .filter(|(_, tender)| {
            filters
                .status
                .as_ref()
                .is_none_or(|status| tender.status == *status)
        })
        .filter(|(_, tender)| {
            filters
                .date
                .is_none_or(|date| created_on(tender, date, offset))
        })
        .map(|(index, _)| index)
        .collect()
}

fn created_on(tender: &Tender, date: Date, offset: UtcOffset) -> bool {
    parse_timestamp(&tender.created_at, offset).is_some_and(|created| {
        same_calendar_day(created, date.midnight().assume_offset(offset), offset)
    })
}

fn matches_query(tender: &Tender, query: &str) -> bool {
    tender.name.to_lowercase().contains(query) || tender.description.to_lowercase().contains(query)
}

/// Memoized filter result keyed by list generation and filter inputs.
#[derive(Debug, Clone, Default)]
pub struct FilteredView {
    key: Option<(u64, FilterState, UtcOffset)>,
    indices: Vec<usize>,
}

impl FilteredView {
    /// Recomputes only when the list generation, filters, or offset changed.
    /// Returns whether a recomputation happened.
    pub fn refresh(
        &mut self,
        generation: u64,
        tenders: &[Tender],
        filters: &FilterState,
        offset: UtcOffset,
    ) -> bool {
        if let Some((cached_generation, cached_filters, cached_offset)) = &self.key
            && *cached_generation == generation
            && cached_filters == filters
            && *cached_offset == offset
        {
            return false;
        }

        self.indices = filter_indices(tenders, filters, offset);
        self.key = Some((generation, filters.clone(), offset));
        true
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn tenders<'a>(&'a self, tenders: &'a [Tender]) -> impl Iterator<Item = &'a Tender> + 'a {
        self.indices.iter().filter_map(|index| tenders.get(*index))
    }
}
