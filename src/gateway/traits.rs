use crate::model::{GatewayError, OfferQuery};
use serde_json::Value;

/// Flight offer search provider. Offers come back untyped so a single
/// malformed one can be dropped without failing the whole batch.
#[async_trait::async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search_offers(&self, query: &OfferQuery) -> Result<Vec<Value>, GatewayError>;
}
