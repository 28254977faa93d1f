//! Page-number pagination with `count`/`next`/`previous` links.

use axum::http::Uri;
use cinema_core::Page;
use serde::Serialize;
use url::form_urlencoded;

use crate::error::{AppError, INVALID_PAGE};

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// `?page=` value; absent or empty means the first page.
pub fn page_number(raw: Option<&str>) -> Result<u64, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(1),
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(invalid_page),
    }
}

fn invalid_page() -> AppError {
    AppError::NotFoundError(INVALID_PAGE.to_string())
}

pub fn paginate<T>(page: Page<T>, number: u64, size: u64, uri: &Uri) -> Result<Paginated<T>, AppError> {
    // The first page may be empty; any later one may not.
    if number > 1 && page.items.is_empty() {
        return Err(invalid_page());
    }

    let seen = (number - 1) * size + page.items.len() as u64;
    let next = (seen < page.total).then(|| page_link(uri, Some(number + 1)));
    let previous = match number {
        1 => None,
        2 => Some(page_link(uri, None)),
        n => Some(page_link(uri, Some(n - 1))),
    };

    Ok(Paginated {
        count: page.total,
        next,
        previous,
        results: page.items,
    })
}

/// Same path and query with `page` replaced, or removed when `None`.
fn page_link(uri: &Uri, number: Option<u64>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.extend_pairs(
        form_urlencoded::parse(uri.query().unwrap_or("").as_bytes()).filter(|(key, _)| key != "page"),
    );
    if let Some(number) = number {
        query.append_pair("page", &number.to_string());
    }

    let query = query.finish();
    if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: u64, len: usize) -> Page<u32> {
        Page { total, items: vec![0; len] }
    }

    #[test]
    fn page_numbers_start_at_one() {
        assert_eq!(page_number(None).unwrap(), 1);
        assert_eq!(page_number(Some("")).unwrap(), 1);
        assert_eq!(page_number(Some("3")).unwrap(), 3);
        assert!(page_number(Some("0")).is_err());
        assert!(page_number(Some("-1")).is_err());
        assert!(page_number(Some("last")).is_err());
    }

    #[test]
    fn links_keep_other_query_parameters() {
        let uri: Uri = "/show/?search=dune&page=2".parse().unwrap();
        let body = paginate(page(25, 10), 2, 10, &uri).unwrap();
        assert_eq!(body.count, 25);
        assert_eq!(body.next.as_deref(), Some("/show/?search=dune&page=3"));
        assert_eq!(body.previous.as_deref(), Some("/show/?search=dune"));
    }

    #[test]
    fn last_page_has_no_next() {
        let uri: Uri = "/reservations/?page=3".parse().unwrap();
        let body = paginate(page(25, 5), 3, 10, &uri).unwrap();
        assert_eq!(body.next, None);
        assert_eq!(body.previous.as_deref(), Some("/reservations/?page=2"));
    }

    #[test]
    fn empty_first_page_is_fine_but_later_ones_are_not() {
        let uri: Uri = "/show/".parse().unwrap();
        let body = paginate(page(0, 0), 1, 10, &uri).unwrap();
        assert_eq!((body.count, body.next, body.previous), (0, None, None));

        assert!(matches!(
            paginate(page(5, 0), 2, 10, &uri),
            Err(AppError::NotFoundError(msg)) if msg == INVALID_PAGE
        ));
    }
}
