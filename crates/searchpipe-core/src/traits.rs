use crate::error::Result;
use crate::types::{SearchQuery, SearchResults};
use futures::future::BoxFuture;

/// A pluggable response-transformation stage.
///
/// Constructed once from configuration, then invoked per response by
/// the host pipeline. A stage returns either a fully transformed
/// result set or an error; it must never hand back a half-mutated one.
pub trait ResponseProcessor: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn tag(&self) -> Option<&str> {
        None
    }

    fn description(&self) -> Option<&str> {
        None
    }

    fn process_response(&self, query: &SearchQuery, results: SearchResults)
        -> Result<SearchResults>;

    /// Variant for hosts that drive stages from an async pipeline.
    /// Wraps the synchronous call by default; stages with async
    /// internals override it to run natively on the host's executor.
    fn process_response_async<'a>(
        &'a self,
        query: &'a SearchQuery,
        results: SearchResults,
    ) -> BoxFuture<'a, Result<SearchResults>> {
        Box::pin(async move { self.process_response(query, results) })
    }
}
