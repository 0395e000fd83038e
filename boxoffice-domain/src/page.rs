use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Sortable event columns for the paged listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Name,
    Venue,
    EventDate,
}

impl SortKey {
    /// Column name as it appears in the events table.
    pub fn column(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Name => "name",
            SortKey::Venue => "venue",
            SortKey::EventDate => "event_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A parsed page request: zero-based page number, page size and sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: SortKey,
    pub direction: SortDirection,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: SortKey::Id,
            direction: SortDirection::Asc,
        }
    }
}

impl PageRequest {
    /// Build a page request from raw query parameters. The sort parameter
    /// takes the form `key` or `key,asc|desc`, with `eventDate` accepted in
    /// camelCase or snake_case.
    pub fn parse(page: Option<u32>, size: Option<u32>, sort: Option<&str>) -> Result<Self, DomainError> {
        let mut request = PageRequest {
            page: page.unwrap_or(0),
            size: size.unwrap_or(DEFAULT_PAGE_SIZE),
            ..PageRequest::default()
        };

        if request.size == 0 || request.size > MAX_PAGE_SIZE {
            return Err(DomainError::Validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if let Some(sort) = sort {
            let mut parts = sort.splitn(2, ',');
            let key = parts.next().unwrap_or_default().trim();

            request.sort = match key {
                "" | "id" => SortKey::Id,
                "name" => SortKey::Name,
                "venue" => SortKey::Venue,
                "eventDate" | "event_date" => SortKey::EventDate,
                other => {
                    return Err(DomainError::Validation(format!("Invalid sort key: {}", other)));
                }
            };

            if let Some(direction) = parts.next() {
                request.direction = match direction.trim() {
                    "asc" | "ASC" => SortDirection::Asc,
                    "desc" | "DESC" => SortDirection::Desc,
                    other => {
                        return Err(DomainError::Validation(format!(
                            "Invalid sort direction: {}",
                            other
                        )));
                    }
                };
            }
        }

        Ok(request)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    /// Cache key for this page. Includes the sort order so pages sorted
    /// differently never share an entry.
    pub fn cache_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.page,
            self.size,
            self.sort.column(),
            self.direction.sql().to_lowercase()
        )
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page={} size={} sort={},{}",
            self.page,
            self.size,
            self.sort.column(),
            self.direction.sql().to_lowercase()
        )
    }
}

/// One page of results plus the totals clients need to paginate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: i64) -> Self {
        let total_pages = if total_elements == 0 {
            0
        } else {
            ((total_elements + i64::from(request.size) - 1) / i64::from(request.size)) as u32
        };

        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let request = PageRequest::parse(None, None, None).unwrap();
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn parse_sort_with_direction() {
        let request = PageRequest::parse(Some(2), Some(10), Some("eventDate,desc")).unwrap();
        assert_eq!(request.page, 2);
        assert_eq!(request.size, 10);
        assert_eq!(request.sort, SortKey::EventDate);
        assert_eq!(request.direction, SortDirection::Desc);
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn parse_rejects_unknown_sort_key() {
        let err = PageRequest::parse(None, None, Some("price")).unwrap_err();
        assert!(err.to_string().contains("Invalid sort key"));
    }

    #[test]
    fn parse_rejects_oversized_page() {
        assert!(PageRequest::parse(None, Some(0), None).is_err());
        assert!(PageRequest::parse(None, Some(MAX_PAGE_SIZE + 1), None).is_err());
    }

    #[test]
    fn cache_key_distinguishes_sort_orders() {
        let asc = PageRequest::parse(Some(0), Some(20), Some("id,asc")).unwrap();
        let desc = PageRequest::parse(Some(0), Some(20), Some("id,desc")).unwrap();
        assert_ne!(asc.cache_key(), desc.cache_key());
    }

    #[test]
    fn page_totals() {
        let request = PageRequest::parse(Some(0), Some(20), None).unwrap();
        let page = Page::new(vec![1, 2, 3], &request, 41);
        assert_eq!(page.total_pages, 3);

        let empty: Page<i32> = Page::new(vec![], &request, 0);
        assert_eq!(empty.total_pages, 0);
    }
}
