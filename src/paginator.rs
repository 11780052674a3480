//! Cursor-following pagination over list endpoints.
//!
//! Pagination is built from small decorators:
//!
//! - [`Endpoint`]: anything that turns parameters into one [`Page`].
//! - [`ignore_limit`]: an endpoint that turns rate-limit errors into empty pages.
//! - [`use_cursor`]: an [`ItemSource`] that keeps calling an endpoint while the
//!   cursor reports more data, yielding every item.
//! - [`limit_amount`]: an item source that stops after a fixed number of items.
//!
//! [`Paginator`] composes them per call, so every traversal starts from the
//! first page:
//!
//! ```rust,no_run
//! use disqus_api::{DisqusApi, Interface, Paginator, Params};
//!
//! # fn run() -> Result<(), disqus_api::ClientError> {
//! let api = DisqusApi::new(Interface::new()).with_secret_key("secret");
//! let paginator = Paginator::new(
//!     api.resource("trends/listThreads"),
//!     Params::new().with("forum", "disqus").with("method", "GET"),
//! );
//!
//! for thread in paginator.run(Some(500), true) {
//!     println!("{}", thread?);
//! }
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use tracing::debug;

use crate::{ClientError, Page, Params, Resource};

/// Parameter carrying the continuation token between pages.
pub const CURSOR_PARAM: &str = "cursor";

/// Lazy sequence of items produced by an [`ItemSource`].
pub type Items<'a> = Box<dyn Iterator<Item = Result<Value, ClientError>> + 'a>;

/// Something that returns one page of results per call.
pub trait Endpoint {
    fn fetch(&self, params: &Params) -> Result<Page, ClientError>;
}

impl<F> Endpoint for F
where
    F: Fn(&Params) -> Result<Page, ClientError>,
{
    fn fetch(&self, params: &Params) -> Result<Page, ClientError> {
        self(params)
    }
}

impl Endpoint for Resource {
    /// Calls the resource and requires a list response.
    fn fetch(&self, params: &Params) -> Result<Page, ClientError> {
        self.call(params.clone())?.into_page().ok_or_else(|| {
            ClientError::UnexpectedResponse(format!(
                "'{}' did not return a list response",
                self.path()
            ))
        })
    }
}

/// Something that produces a lazy sequence of items for a parameter set.
///
/// The returned iterator does not borrow the source itself, so a composed
/// source can be built, drained and dropped within one traversal.
pub trait ItemSource {
    fn items<'a>(&self, params: Params) -> Items<'a>
    where
        Self: 'a;
}

impl<F, I> ItemSource for F
where
    F: Fn(Params) -> I,
    I: IntoIterator<Item = Result<Value, ClientError>>,
    I::IntoIter: 'static,
{
    fn items<'a>(&self, params: Params) -> Items<'a>
    where
        Self: 'a,
    {
        Box::new(self(params).into_iter())
    }
}

/// Endpoint wrapper turning rate-limit failures into empty pages.
#[derive(Clone, Debug)]
pub struct IgnoreLimit<E> {
    endpoint: E,
}

/// Wraps `endpoint` so rate-limit errors yield an empty [`Page`].
///
/// Every other error is returned unchanged.
pub fn ignore_limit<E: Endpoint>(endpoint: E) -> IgnoreLimit<E> {
    IgnoreLimit { endpoint }
}

impl<E: Endpoint> Endpoint for IgnoreLimit<E> {
    fn fetch(&self, params: &Params) -> Result<Page, ClientError> {
        match self.endpoint.fetch(params) {
            Err(error) if error.is_rate_limit() => {
                debug!(%error, "rate limit reached, ending pagination");
                Ok(Page::default())
            }
            other => other,
        }
    }
}

/// Item source following cursors across pages of an endpoint.
#[derive(Clone, Debug)]
pub struct UseCursor<E> {
    endpoint: E,
}

/// Wraps `endpoint` into an item source that follows cursors.
///
/// After each page, if its cursor reports more data the cursor id is sent as
/// the `cursor` parameter of the next call. Termination depends on the
/// remote API eventually reporting no more data.
pub fn use_cursor<E: Endpoint + Clone>(endpoint: E) -> UseCursor<E> {
    UseCursor { endpoint }
}

impl<E: Endpoint + Clone> ItemSource for UseCursor<E> {
    fn items<'a>(&self, params: Params) -> Items<'a>
    where
        Self: 'a,
    {
        Box::new(CursorItems {
            endpoint: self.endpoint.clone(),
            params,
            buffer: Vec::new().into_iter(),
            done: false,
        })
    }
}

struct CursorItems<E> {
    endpoint: E,
    params: Params,
    buffer: std::vec::IntoIter<Value>,
    done: bool,
}

impl<E: Endpoint> Iterator for CursorItems<E> {
    type Item = Result<Value, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.next() {
                return Some(Ok(item));
            }
            if self.done {
                return None;
            }

            let page = match self.endpoint.fetch(&self.params) {
                Ok(page) => page,
                Err(error) => {
                    self.done = true;
                    return Some(Err(error));
                }
            };

            let (items, cursor) = page.into_parts();
            match cursor.next_id() {
                Some(next) => {
                    debug!(cursor = %next, "following cursor");
                    self.params.insert(CURSOR_PARAM, next);
                }
                None => self.done = true,
            }
            self.buffer = items.into_iter();
        }
    }
}

/// Item source stopping after a fixed number of items.
#[derive(Clone, Debug)]
pub struct LimitAmount<S> {
    source: S,
    limit: usize,
}

/// Wraps `source` so it yields at most `limit` items.
///
/// The wrapped source is never asked for more than `limit` items, so no page
/// beyond the one holding the last item is fetched.
pub fn limit_amount<S: ItemSource>(source: S, limit: usize) -> LimitAmount<S> {
    LimitAmount { source, limit }
}

impl<S: ItemSource> ItemSource for LimitAmount<S> {
    fn items<'a>(&self, params: Params) -> Items<'a>
    where
        Self: 'a,
    {
        Box::new(self.source.items(params).take(self.limit))
    }
}

/// Restartable traversal over every item of a list endpoint.
///
/// Each call to [`Paginator::run`] (or each iteration) starts again from the
/// first page with the fixed parameters; no cursor state is shared between
/// traversals.
#[derive(Clone, Debug)]
pub struct Paginator<E> {
    endpoint: E,
    params: Params,
}

impl<E: Endpoint> Paginator<E> {
    pub fn new(endpoint: E, params: Params) -> Self {
        Self { endpoint, params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Traverses the endpoint.
    ///
    /// `limit` caps the number of yielded items. With `silence_limit`, a
    /// rate-limit error ends the traversal quietly instead of being yielded.
    pub fn run(&self, limit: Option<usize>, silence_limit: bool) -> Items<'_> {
        let endpoint = &self.endpoint;
        let fetch = move |params: &Params| endpoint.fetch(params);
        let params = self.params.clone();
        if silence_limit {
            compose(ignore_limit(fetch), limit, params)
        } else {
            compose(fetch, limit, params)
        }
    }

    /// Traverses every item without a limit.
    pub fn iter(&self) -> Items<'_> {
        self.run(None, false)
    }
}

impl<'a, E: Endpoint> IntoIterator for &'a Paginator<E> {
    type Item = Result<Value, ClientError>;
    type IntoIter = Items<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn compose<'a, E>(endpoint: E, limit: Option<usize>, params: Params) -> Items<'a>
where
    E: Endpoint + Clone + 'a,
{
    let source = use_cursor(endpoint);
    match limit {
        Some(limit) => limit_amount(source, limit).items(params),
        None => source.items(params),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::{Value, json};

    use super::{Endpoint, ItemSource, Paginator, ignore_limit, limit_amount, use_cursor};
    use crate::request::tests::ScriptedConnector;
    use crate::{ClientError, Cursor, DisqusApi, Interface, Page, ParamValue, Params};

    fn page(items: &[i64], cursor: Option<Cursor>) -> Page {
        Page::new(items.iter().copied().map(Value::from).collect(), cursor)
    }

    fn rate_limited() -> ClientError {
        ClientError::from_api_code(14, json!("error"))
    }

    fn collect(items: super::Items<'_>) -> Result<Vec<Value>, ClientError> {
        items.collect()
    }

    fn two_pages(params: &Params) -> Result<Page, ClientError> {
        match params.get("cursor") {
            None => Ok(page(&[1, 2], Some(Cursor::new(true, 3)))),
            Some(ParamValue::Single(cursor)) => {
                let cursor: i64 = cursor.parse().expect("numeric cursor");
                Ok(page(&[cursor], None))
            }
            Some(other) => panic!("unexpected cursor {other:?}"),
        }
    }

    fn limited_after_first_page(params: &Params) -> Result<Page, ClientError> {
        if params.contains_key("cursor") {
            Err(rate_limited())
        } else {
            Ok(page(&[1, 2], Some(Cursor::new(true, 3))))
        }
    }

    #[test]
    fn ignore_limit_passes_success_through() {
        let endpoint = |_: &Params| Ok::<_, ClientError>(page(&[1], None));
        assert_eq!(
            ignore_limit(endpoint).fetch(&Params::new()).expect("success"),
            page(&[1], None)
        );
    }

    #[test]
    fn ignore_limit_turns_rate_limit_into_empty_page() {
        let endpoint = |_: &Params| -> Result<Page, ClientError> { Err(rate_limited()) };
        assert_eq!(
            ignore_limit(endpoint).fetch(&Params::new()).expect("suppressed"),
            Page::default()
        );
    }

    #[test]
    fn ignore_limit_propagates_other_errors() {
        let endpoint = |_: &Params| -> Result<Page, ClientError> {
            Err(ClientError::from_api_code(18, json!("bad token")))
        };
        let error = ignore_limit(endpoint)
            .fetch(&Params::new())
            .expect_err("not a rate limit");
        assert!(matches!(error, ClientError::InvalidAccessToken { .. }));
    }

    #[test]
    fn use_cursor_single_page() {
        let endpoint = |_: &Params| Ok::<_, ClientError>(page(&[1, 2], None));
        let items = collect(use_cursor(endpoint).items(Params::new())).expect("success");
        assert_eq!(items, vec![json!(1), json!(2)]);
    }

    #[test]
    fn use_cursor_follows_more_flag() {
        let items = collect(use_cursor(two_pages).items(Params::new())).expect("success");
        assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn use_cursor_stops_when_more_is_false() {
        let calls = Cell::new(0);
        let endpoint = |_: &Params| {
            calls.set(calls.get() + 1);
            Ok::<_, ClientError>(page(&[1], Some(Cursor::new(false, "next"))))
        };
        let items = collect(use_cursor(endpoint).items(Params::new())).expect("success");
        assert_eq!(items, vec![json!(1)]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn use_cursor_yields_error_once_and_stops() {
        let mut items = use_cursor(limited_after_first_page).items(Params::new());
        assert_eq!(items.next().map(Result::ok), Some(Some(json!(1))));
        assert_eq!(items.next().map(Result::ok), Some(Some(json!(2))));
        assert!(matches!(items.next(), Some(Err(ClientError::RateLimit { .. }))));
        assert!(items.next().is_none());
    }

    #[test]
    fn use_cursor_is_lazy() {
        let calls = Cell::new(0);
        let endpoint = |_: &Params| {
            calls.set(calls.get() + 1);
            Ok::<_, ClientError>(page(&[1], None))
        };
        let source = use_cursor(endpoint);
        let items = source.items(Params::new());
        assert_eq!(calls.get(), 0);
        drop(items);
    }

    #[test]
    fn limit_amount_truncates() {
        let hundred = |_: Params| (0..100).map(|n| Ok::<Value, ClientError>(Value::from(n)));
        let items = collect(limit_amount(hundred, 10).items(Params::new())).expect("success");
        assert_eq!(items, (0..10).map(Value::from).collect::<Vec<_>>());
    }

    #[test]
    fn limit_amount_larger_than_source() {
        let two = |_: Params| (0..2).map(|n| Ok::<Value, ClientError>(Value::from(n)));
        let items = collect(limit_amount(two, 10).items(Params::new())).expect("success");
        assert_eq!(items, vec![json!(0), json!(1)]);
    }

    #[test]
    fn limit_amount_does_not_fetch_past_limit() {
        let calls = Cell::new(0);
        let endpoint = |params: &Params| {
            calls.set(calls.get() + 1);
            two_pages(params)
        };
        let items = collect(limit_amount(use_cursor(endpoint), 2).items(Params::new()))
            .expect("success");
        assert_eq!(items, vec![json!(1), json!(2)]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn paginator_iterates_everything() {
        let endpoint = |_: &Params| Ok::<_, ClientError>(page(&[1, 2], None));
        let paginator = Paginator::new(endpoint, Params::new());
        let items: Result<Vec<Value>, ClientError> = (&paginator).into_iter().collect();
        assert_eq!(items.expect("success"), vec![json!(1), json!(2)]);
    }

    #[test]
    fn paginator_limit() {
        let endpoint = |_: &Params| Ok::<_, ClientError>(page(&[1, 2, 3, 4], None));
        let paginator = Paginator::new(endpoint, Params::new());
        let items = collect(paginator.run(Some(2), false)).expect("success");
        assert_eq!(items, vec![json!(1), json!(2)]);
    }

    #[test]
    fn paginator_silence_limit() {
        let paginator = Paginator::new(limited_after_first_page, Params::new());
        let items = collect(paginator.run(None, true)).expect("rate limit is silenced");
        assert_eq!(items, vec![json!(1), json!(2)]);
    }

    #[test]
    fn paginator_without_silence_surfaces_rate_limit() {
        let paginator = Paginator::new(limited_after_first_page, Params::new());
        let error = collect(paginator.run(None, false)).expect_err("rate limit surfaces");
        assert!(error.is_rate_limit());
    }

    #[test]
    fn paginator_restarts_from_first_page() {
        let paginator = Paginator::new(two_pages, Params::new().with("forum", "disqus"));
        let first = collect(paginator.iter()).expect("success");
        let second = collect(paginator.iter()).expect("success");
        assert_eq!(first, second);
        assert!(!paginator.params().contains_key("cursor"));
    }

    #[test]
    fn paginator_over_resource_sends_cursor() {
        let connector = ScriptedConnector::default()
            .reply(
                200,
                r#"{"response": ["a", "b"], "cursor": {"more": true, "id": "1:0:0"}}"#,
            )
            .reply(
                200,
                r#"{"response": ["c"], "cursor": {"more": false, "id": null}}"#,
            );
        let interface = Interface::from_value(&json!({
            "trends": {"listThreads": {"required": ["forum"], "method": "GET"}}
        }))
        .expect("valid interface");
        let api = DisqusApi::new(interface).with_connector(connector.clone());
        let paginator = Paginator::new(
            api.resource("trends/listThreads"),
            Params::new().with("forum", "disqus"),
        );

        let items = collect(paginator.iter()).expect("success");

        assert_eq!(items, vec![json!("a"), json!("b"), json!("c")]);
        let paths: Vec<String> = connector.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "/api/3.0/trends/listThreads.json?forum=disqus".to_owned(),
                "/api/3.0/trends/listThreads.json?forum=disqus&cursor=1%3A0%3A0".to_owned(),
            ]
        );
    }

    #[test]
    fn resource_endpoint_rejects_scalar_responses() {
        let connector = ScriptedConnector::default().reply(200, r#"{"response": 1}"#);
        let api = DisqusApi::new(Interface::new()).with_connector(connector);
        let error = api
            .resource("forums/details")
            .fetch(&Params::new().with("method", "GET"))
            .expect_err("scalar response");
        assert!(matches!(error, ClientError::UnexpectedResponse(_)));
    }
}
