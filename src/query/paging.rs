//! Paging: `limit`/`offset` parameters and first/last/next/prev navigation links.

use crate::error::AppError;
use crate::request::QueryParams;
use crate::sql::QueryContext;

/// Applies `limit` and, when a limit is present, `offset`. Both must be non-negative
/// integers; in quiet mode an invalid value is skipped instead of failing.
pub fn apply_paging(params: &QueryParams, query: &mut QueryContext, quiet: bool) -> Result<(), AppError> {
    let Some(limit) = params.get("limit") else {
        return Ok(());
    };
    match limit.trim().parse::<u64>() {
        Ok(n) => query.set_limit(n),
        Err(_) if quiet => return Ok(()),
        Err(_) => return Err(AppError::InvalidArgument(format!("limit value {}", limit))),
    }

    let Some(offset) = params.get("offset") else {
        return Ok(());
    };
    match offset.trim().parse::<u64>() {
        Ok(n) => query.set_offset(n),
        Err(_) if quiet => {}
        Err(_) => return Err(AppError::InvalidArgument(format!("offset value {}", offset))),
    }
    Ok(())
}

/// Clamped paging window over `max` matching rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: u64,
    pub offset: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

impl PageWindow {
    /// `limit` is capped at `max` and floored at 1; `offset` is floored at 0 and capped
    /// at `max`. A full final page is not counted as an extra empty page.
    pub fn compute(max: u64, limit: i64, offset: Option<i64>) -> Self {
        let limit = (if limit < 0 { 1 } else { (limit as u64).min(max) }).max(1);
        let offset = offset.filter(|o| *o >= 0).map(|o| o as u64).unwrap_or(0).min(max);
        let current_page = offset / limit;
        let mut total_pages = max / limit;
        if max % limit == 0 {
            total_pages = total_pages.saturating_sub(1);
        }
        PageWindow {
            limit,
            offset,
            current_page,
            total_pages,
        }
    }

    fn next_offset(&self) -> u64 {
        (self.current_page + 1).min(self.total_pages) * self.limit
    }

    fn prev_offset(&self) -> u64 {
        self.current_page.saturating_sub(1) * self.limit
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub next: String,
    pub prev: String,
}

/// Links rewrite `limit`/`offset` on a copy of the request's parameters; `offset` is
/// dropped when zero. Returns `None` when `limit` is absent or not a number.
pub fn assemble_paging_links(base_url: &str, path: &str, params: &QueryParams, max: u64) -> Option<PageLinks> {
    let limit = params.get("limit")?.trim().parse::<i64>().ok()?;
    let offset = params.get("offset").and_then(|o| o.trim().parse::<i64>().ok());
    let window = PageWindow::compute(max, limit, offset);

    let link = |offset: u64| {
        let mut query = params.clone();
        query.set("limit", window.limit.to_string());
        if offset == 0 {
            query.remove("offset");
        } else {
            query.set("offset", offset.to_string());
        }
        format!("{}{}?{}", base_url, path, query.encode())
    };

    Some(PageLinks {
        first: link(0),
        last: link(window.total_pages * window.limit),
        next: link(window.next_offset()),
        prev: link(window.prev_offset()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_last_page_counts() {
        let w = PageWindow::compute(95, 20, Some(0));
        assert_eq!(w.total_pages, 4);
    }

    #[test]
    fn full_last_page_is_not_an_extra_page() {
        let w = PageWindow::compute(100, 20, Some(40));
        assert_eq!(w.total_pages, 4);
        assert_eq!(w.current_page, 2);
    }

    #[test]
    fn offset_and_limit_are_clamped() {
        let w = PageWindow::compute(95, 20, Some(120));
        assert_eq!(w.offset, 95);
        assert_eq!(w.current_page, 4);

        let w = PageWindow::compute(10, 50, Some(-3));
        assert_eq!(w.limit, 10);
        assert_eq!(w.offset, 0);

        let w = PageWindow::compute(10, -5, None);
        assert_eq!(w.limit, 1);

        let w = PageWindow::compute(0, 20, None);
        assert_eq!(w.limit, 1);
        assert_eq!(w.total_pages, 0);
    }

    #[test]
    fn links_rewrite_limit_and_offset() {
        let params = QueryParams::parse("fields=name&sort_by=-name&limit=2&offset=2");
        let links = assemble_paging_links("http://localhost:3000", "/entries", &params, 5).unwrap();
        assert_eq!(links.first, "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2");
        assert_eq!(links.last, "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2&offset=4");
        assert_eq!(links.next, "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2&offset=4");
        assert_eq!(links.prev, "http://localhost:3000/entries?fields=name&sort_by=-name&limit=2");
    }

    #[test]
    fn no_links_without_numeric_limit() {
        let base = "http://localhost:3000";
        assert!(assemble_paging_links(base, "/entries", &QueryParams::parse("offset=2"), 5).is_none());
        assert!(assemble_paging_links(base, "/entries", &QueryParams::parse("limit=all"), 5).is_none());
    }

    #[test]
    fn apply_paging_rejects_non_numeric_values_unless_quiet() {
        let mut query = QueryContext::new(crate::sql::TableRef::named("idea"));
        let err = apply_paging(&QueryParams::parse("limit=ten"), &mut query, false).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: limit value ten");
        let err = apply_paging(&QueryParams::parse("limit=5&offset=-1"), &mut query, false).unwrap_err();
        assert_eq!(err.to_string(), "invalid argument: offset value -1");

        let mut query = QueryContext::new(crate::sql::TableRef::named("idea"));
        apply_paging(&QueryParams::parse("limit=ten&offset=3"), &mut query, true).unwrap();
        assert_eq!(query.limit(), None);
        assert_eq!(query.offset(), None);

        apply_paging(&QueryParams::parse("limit=5&offset=10"), &mut query, false).unwrap();
        assert_eq!((query.limit(), query.offset()), (Some(5), Some(10)));
    }
}
