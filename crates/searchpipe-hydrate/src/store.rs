use crate::attr::AttrItem;
use async_trait::async_trait;

/// Batched lookup capability against the external document store.
///
/// Implemented by whatever client the host wires in, typically a
/// DynamoDB-style batch-get API. Credentials, transport, timeouts and
/// retries all belong to that client; the hydrate stage only
/// partitions keys and merges results.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Largest number of keys the store accepts in one batched lookup.
    fn max_batch_size(&self) -> usize;

    /// Fetch the items whose primary-key attribute equals one of
    /// `keys`. Keys with no backing item are simply absent from the
    /// returned items.
    async fn batch_get(
        &self,
        table: &str,
        pk_attribute: &str,
        keys: &[String],
    ) -> anyhow::Result<Vec<AttrItem>>;
}
