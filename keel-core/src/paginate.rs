//! Paginate - Drain paginated list APIs into one result list
//!
//! Two protocols are supported: page-number (stop on a short page) and
//! next-token (stop when no token comes back). An error on any page fails
//! the whole read; pages fetched before it are discarded.

use std::future::Future;

use log::{debug, warn};

use crate::error::ReconcileResult;
use crate::value::{Value, ValueMap};

/// Page-number pagination.
///
/// `page_fn` receives a copy of `condition` with `page_size_field` and
/// `page_number_field` filled in. Reading stops at the first page holding
/// fewer than `page_size` items, so the API must return short final pages.
pub async fn with_page_number_query<F, Fut>(
    condition: &ValueMap,
    page_size_field: &str,
    page_number_field: &str,
    page_size: usize,
    first_page: i64,
    mut page_fn: F,
) -> ReconcileResult<Vec<Value>>
where
    F: FnMut(ValueMap) -> Fut,
    Fut: Future<Output = ReconcileResult<Vec<Value>>>,
{
    let page_size = page_size.max(1);
    let mut results = Vec::new();
    let mut page_number = first_page;

    loop {
        let mut query = condition.clone();
        query.insert(page_size_field.to_string(), Value::Int(page_size as i64));
        query.insert(page_number_field.to_string(), Value::Int(page_number));

        let page = page_fn(query).await?;
        let count = page.len();
        debug!("page {} returned {} items", page_number, count);
        results.extend(page);

        if count < page_size {
            break;
        }
        page_number += 1;
    }

    Ok(results)
}

/// Next-token pagination.
///
/// `page_fn` receives a copy of `condition` with `max_results_field` set and,
/// after the first page, `next_token_field` set to the previous token. It
/// returns the page items and the next token; an empty or absent token ends
/// the read.
pub async fn with_next_token_query<F, Fut>(
    condition: &ValueMap,
    max_results_field: &str,
    next_token_field: &str,
    max_results: usize,
    first_token: Option<String>,
    mut page_fn: F,
) -> ReconcileResult<Vec<Value>>
where
    F: FnMut(ValueMap) -> Fut,
    Fut: Future<Output = ReconcileResult<(Vec<Value>, Option<String>)>>,
{
    let mut results = Vec::new();
    let mut token = first_token.filter(|t| !t.is_empty());

    loop {
        let mut query = condition.clone();
        query.insert(max_results_field.to_string(), Value::Int(max_results as i64));
        if let Some(t) = &token {
            query.insert(next_token_field.to_string(), Value::String(t.clone()));
        }

        let (page, next) = page_fn(query).await?;
        debug!("token page returned {} items", page.len());
        results.extend(page);

        match next.filter(|t| !t.is_empty()) {
            None => break,
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                warn!("next token '{}' repeated, stopping pagination", next);
                break;
            }
            Some(next) => token = Some(next),
        }
    }

    Ok(results)
}

/// Single-shot list call for unpaginated APIs
pub async fn with_simple_query<F, Fut>(condition: &ValueMap, page_fn: F) -> ReconcileResult<Vec<Value>>
where
    F: FnOnce(ValueMap) -> Fut,
    Fut: Future<Output = ReconcileResult<Vec<Value>>>,
{
    page_fn(condition.clone()).await
}
