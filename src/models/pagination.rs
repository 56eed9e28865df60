//! Page arithmetic for list endpoints
use std::collections::HashMap;

use url::form_urlencoded;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageParams {
    pub page: usize,
    pub page_size: usize,
}

impl PageParams {
    pub const DEFAULT_PAGE_SIZE: usize = 50;
    pub const MAX_PAGE_SIZE: usize = 500;

    /// Missing or malformed values fall back to defaults, sizes are clamped.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let page = params
            .get("page")
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);
        let page_size = params
            .get("page_size")
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|size| *size > 0)
            .map(|size| size.min(Self::MAX_PAGE_SIZE))
            .unwrap_or(Self::DEFAULT_PAGE_SIZE);
        Self { page, page_size }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub count: usize,
    pub num_pages: usize,
    pub current_page: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Where a page lives: absolute base, path and the query to preserve.
#[derive(Clone, Debug, PartialEq)]
pub struct PageLocation {
    pub base_url: String,
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl PageLocation {
    fn link(&self, page: usize, page_size: usize) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.query {
            if key != "page" && key != "page_size" {
                serializer.append_pair(key, value);
            }
        }
        if page > 1 {
            serializer.append_pair("page", &page.to_string());
        }
        serializer.append_pair("page_size", &page_size.to_string());
        format!("{}{}?{}", self.base_url.trim_end_matches('/'), self.path, serializer.finish())
    }
}

/// Cuts `items` into the requested page, `None` when the page does not exist.
pub fn paginate<T>(items: Vec<T>, params: PageParams, location: &PageLocation) -> Option<Page<T>> {
    let count = items.len();
    let num_pages = ((count + params.page_size - 1) / params.page_size).max(1);
    if params.page > num_pages {
        return None;
    }

    let results = items
        .into_iter()
        .skip((params.page - 1) * params.page_size)
        .take(params.page_size)
        .collect();
    let next = if params.page < num_pages {
        Some(location.link(params.page + 1, params.page_size))
    } else {
        None
    };
    let previous = if params.page > 1 {
        Some(location.link(params.page - 1, params.page_size))
    } else {
        None
    };

    Some(Page {
        count,
        num_pages,
        current_page: params.page,
        next,
        previous,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location() -> PageLocation {
        PageLocation {
            base_url: "http://localhost:8000/".to_string(),
            path: "/coupons/1/codes".to_string(),
            query: vec![
                ("code_filter".to_string(), "unassigned".to_string()),
                ("page".to_string(), "2".to_string()),
            ],
        }
    }

    #[test]
    fn test_paginate_middle_page() {
        let params = PageParams { page: 2, page_size: 2 };
        let page = paginate((1..6).collect::<Vec<_>>(), params, &location()).unwrap();
        assert_eq!(page.count, 5);
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.results, vec![3, 4]);
        assert_eq!(
            page.next,
            Some("http://localhost:8000/coupons/1/codes?code_filter=unassigned&page=3&page_size=2".to_string())
        );
        assert_eq!(
            page.previous,
            Some("http://localhost:8000/coupons/1/codes?code_filter=unassigned&page_size=2".to_string())
        );
    }

    #[test]
    fn test_paginate_empty_and_out_of_range() {
        let params = PageParams { page: 1, page_size: 10 };
        let page = paginate(Vec::<i32>::new(), params, &location()).unwrap();
        assert_eq!(page.count, 0);
        assert_eq!(page.num_pages, 1);
        assert!(page.next.is_none() && page.previous.is_none());

        let params = PageParams { page: 2, page_size: 10 };
        assert!(paginate(vec![1], params, &location()).is_none());
    }

    #[test]
    fn test_page_params_from_query() {
        let mut query = HashMap::new();
        query.insert("page".to_string(), "0".to_string());
        query.insert("page_size".to_string(), "100000".to_string());
        assert_eq!(
            PageParams::from_query(&query),
            PageParams {
                page: 1,
                page_size: PageParams::MAX_PAGE_SIZE
            }
        );
    }
}
