//! Client-side filtering, sorting and paging of list data.
//!
//! The whole list is fetched once; [`TableDataSource`] narrows it down
//! locally. [`TableState`] round-trips through query parameters
//! (`q`, `order`, `page`, `perPage`) so a view can be bookmarked.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::{ChatSessionHeader, KnowledgeBaseItem, UserHeader};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// Active sort column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse the `order` parameter: `col` ascending, `-col` descending.
    pub fn parse(value: &str) -> Option<Self> {
        match value.strip_prefix('-') {
            Some("") => None,
            Some(column) => Some(Self::desc(column)),
            None if value.is_empty() => None,
            None => Some(Self::asc(value)),
        }
    }

    /// Render as the `order` parameter.
    pub fn to_param(&self) -> String {
        match self.direction {
            SortDirection::Asc => self.column.clone(),
            SortDirection::Desc => format!("-{}", self.column),
        }
    }
}

/// Filter, sort and page settings of a list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    /// Lower-cased, trimmed filter text; empty matches everything
    pub filter: String,
    pub sort: Option<SortSpec>,
    /// Zero-based page number
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            filter: String::new(),
            sort: None,
            page_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl TableState {
    /// Set the filter text. Stored trimmed and lower-cased.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.trim().to_lowercase();
    }

    /// Query parameters describing this state.
    ///
    /// Paging is only emitted away from the first page.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if !self.filter.is_empty() {
            params.push(("q".to_string(), self.filter.clone()));
        }
        if let Some(sort) = &self.sort {
            params.push(("order".to_string(), sort.to_param()));
        }
        if self.page_index != 0 {
            params.push(("page".to_string(), (self.page_index + 1).to_string()));
            params.push(("perPage".to_string(), self.page_size.to_string()));
        }
        params
    }

    /// Rebuild state from query parameters.
    ///
    /// A missing or invalid `page` means the first page; an invalid
    /// `perPage` keeps the default size.
    pub fn parse_params<'a, I>(params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut state = Self::default();
        for (key, value) in params {
            match key {
                "q" => state.set_filter(value),
                "order" => state.sort = SortSpec::parse(value),
                "page" => {
                    state.page_index = value
                        .parse::<usize>()
                        .ok()
                        .and_then(|page| page.checked_sub(1))
                        .unwrap_or(0);
                }
                "perPage" => {
                    if let Some(size) = value.parse::<usize>().ok().filter(|&n| n > 0) {
                        state.page_size = size;
                    }
                }
                _ => {}
            }
        }
        state
    }

    /// Encode the state as a query string, without the leading `?`.
    pub fn to_query(&self) -> String {
        self.to_params()
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Rebuild state from a query string such as `q=refund&order=-title&page=2`.
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> = query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self::parse_params(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Value a row is sorted by.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Text(String),
    Number(f64),
    Time(DateTime<Utc>),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Number(_) => 0,
            SortKey::Text(_) => 1,
            SortKey::Time(_) => 2,
        }
    }

    fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

/// A row that can be shown in a [`TableDataSource`].
pub trait TableRow {
    /// Text searched by the filter.
    fn filter_text(&self) -> String;

    /// Sort value for `column`; `None` for unknown columns or missing values.
    fn sort_key(&self, column: &str) -> Option<SortKey>;
}

/// One page of filtered, sorted rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub rows: Vec<&'a T>,
    /// Rows matching the filter, across all pages
    pub total: usize,
    /// Page actually shown; clamped to the last page
    pub page_index: usize,
    pub page_count: usize,
}

/// In-memory list with filter, sort and paging applied on read.
#[derive(Debug, Clone)]
pub struct TableDataSource<T> {
    data: Vec<T>,
    pub state: TableState,
}

impl<T: TableRow> TableDataSource<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            state: TableState::default(),
        }
    }

    pub fn with_state(mut self, state: TableState) -> Self {
        self.state = state;
        self
    }

    /// Rows matching the filter, sorted. Sorting is stable; rows without a
    /// key for the sort column go first when ascending.
    pub fn filtered(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = if self.state.filter.is_empty() {
            self.data.iter().collect()
        } else {
            self.data
                .iter()
                .filter(|row| row.filter_text().to_lowercase().contains(&self.state.filter))
                .collect()
        };

        if let Some(sort) = &self.state.sort {
            rows.sort_by_cached_key(|row| SortCell(row.sort_key(&sort.column)));
            if sort.direction == SortDirection::Desc {
                // ties keep their original order
                rows = reverse_stable(rows, &sort.column);
            }
        }
        rows
    }

    /// The current page.
    pub fn page(&self) -> Page<'_, T> {
        let rows = self.filtered();
        let total = rows.len();
        let size = self.state.page_size.max(1);
        let page_count = total.div_ceil(size).max(1);
        let page_index = self.state.page_index.min(page_count - 1);

        Page {
            rows: rows.into_iter().skip(page_index * size).take(size).collect(),
            total,
            page_index,
            page_count,
        }
    }
}

/// Orderable wrapper so sort keys can go through `sort_by_cached_key`.
struct SortCell(Option<SortKey>);

impl PartialEq for SortCell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortCell {}

impl PartialOrd for SortCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortCell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => a.compare(b),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Descending order that keeps equal rows in their original order.
fn reverse_stable<'a, T: TableRow>(rows: Vec<&'a T>, column: &str) -> Vec<&'a T> {
    let mut groups: Vec<(SortCell, Vec<&'a T>)> = Vec::new();
    for row in rows {
        let cell = SortCell(row.sort_key(column));
        match groups.last_mut() {
            Some((last, group)) if *last == cell => group.push(row),
            _ => groups.push((cell, vec![row])),
        }
    }
    groups.into_iter().rev().flat_map(|(_, group)| group).collect()
}

impl TableRow for ChatSessionHeader {
    fn filter_text(&self) -> String {
        format!(
            "{} {} {}",
            self.summary.as_deref().unwrap_or(""),
            self.chat_session_id,
            self.user
        )
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        match column {
            "created" => Some(SortKey::Time(self.created)),
            "summary" => self.summary.clone().map(SortKey::Text),
            "chat_session_id" | "id" => Some(SortKey::Text(self.chat_session_id.clone())),
            "user" => Some(SortKey::Text(self.user.clone())),
            _ => None,
        }
    }
}

impl TableRow for KnowledgeBaseItem {
    fn filter_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.item_id.as_deref().unwrap_or(""),
            self.title,
            self.keywords.join(" "),
            self.content
        )
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        match column {
            "title" | "name" => Some(SortKey::Text(self.title.clone())),
            "item_id" | "id" => self.item_id.as_ref().map(|id| match id.parse::<f64>() {
                Ok(n) => SortKey::Number(n),
                Err(_) => SortKey::Text(id.clone()),
            }),
            _ => None,
        }
    }
}

impl TableRow for UserHeader {
    fn filter_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.email,
            self.given_name.as_deref().unwrap_or(""),
            self.family_name.as_deref().unwrap_or(""),
            self.roles.join(" ")
        )
    }

    fn sort_key(&self, column: &str) -> Option<SortKey> {
        match column {
            "email" | "id" => Some(SortKey::Text(self.email.clone())),
            "given_name" => self.given_name.clone().map(SortKey::Text),
            "family_name" | "name" => self.family_name.clone().map(SortKey::Text),
            _ => None,
        }
    }
}
