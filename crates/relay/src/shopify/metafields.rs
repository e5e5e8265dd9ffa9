//! Customer passport metafield operations against the Admin GraphQL API.

use std::sync::Arc;

use alfie_passport_core::{CustomerId, Passport};
use reqwest::header::CONTENT_TYPE;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{instrument, warn};

use crate::config::ShopifyConfig;

use super::RemoteError;

/// Metafield namespace holding the tasting passport.
pub const PASSPORT_NAMESPACE: &str = "alfie";
/// Metafield key holding the tasting passport.
pub const PASSPORT_KEY: &str = "tasting_passport";

const FETCH_PASSPORT_QUERY: &str = r"
query CustomerPassport($id: ID!, $namespace: String!, $key: String!) {
  customer(id: $id) {
    metafield(namespace: $namespace, key: $key) {
      value
    }
  }
}
";

const SAVE_PASSPORT_MUTATION: &str = r"
mutation SaveCustomerPassport($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields {
      id
    }
    userErrors {
      field
      message
    }
  }
}
";

/// Client for the passport metafield on the Shopify Admin API.
///
/// Issues exactly two operations: the passport fetch (the migration source)
/// and the passport write (pre-cutover tooling only - the relay's service
/// layer never calls it).
#[derive(Clone)]
pub struct MetafieldClient {
    inner: Arc<MetafieldClientInner>,
}

struct MetafieldClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl MetafieldClient {
    /// Create a new metafield client.
    #[must_use]
    pub fn new(config: &ShopifyConfig) -> Self {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            inner: Arc::new(MetafieldClientInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.admin_token.expose_secret().to_string(),
            }),
        }
    }

    /// Execute a GraphQL operation.
    async fn execute<V, T>(&self, query: &'static str, variables: V) -> Result<T, RemoteError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Access-Token", &self.inner.access_token)
            .header(CONTENT_TYPE, "application/json")
            .json(&GraphQLRequest { query, variables })
            .send()
            .await?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(RemoteError::Transport(status.as_u16()));
        }

        let parsed: GraphQLResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
            RemoteError::Api(format!("unparsable response: {e}"))
        })?;

        if let Some(errors) = parsed.errors
            && let Some(first) = errors.into_iter().next()
        {
            return Err(RemoteError::Api(first.message));
        }

        parsed
            .data
            .ok_or_else(|| RemoteError::Api("no data in response".to_string()))
    }

    /// Fetch a customer's legacy passport from the metafield.
    ///
    /// Absence is not an error: a missing customer, a missing metafield, or
    /// an empty value all come back as an empty passport. A stored value
    /// that is not valid JSON is logged and also treated as empty - bad
    /// legacy data never becomes a hard failure.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the API request fails or reports errors.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn fetch_passport(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Passport, RemoteError> {
        let variables = json!({
            "id": customer_gid(customer_id),
            "namespace": PASSPORT_NAMESPACE,
            "key": PASSPORT_KEY,
        });

        let data: CustomerMetafieldData = self.execute(FETCH_PASSPORT_QUERY, variables).await?;

        let Some(value) = data
            .customer
            .and_then(|c| c.metafield)
            .map(|m| m.value)
            .filter(|v| !v.trim().is_empty())
        else {
            return Ok(Passport::default());
        };

        match serde_json::from_str(&value) {
            Ok(passport) => Ok(passport),
            Err(e) => {
                warn!(
                    error = %e,
                    "Stored passport metafield is not valid JSON, treating as empty"
                );
                Ok(Passport::default())
            }
        }
    }

    /// Write a customer's whole passport back to the metafield.
    ///
    /// Pre-cutover surface only; once the document store owns the data the
    /// service never calls this.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the API request fails, reports errors, or
    /// the mutation comes back with user errors.
    #[instrument(skip(self, passport), fields(customer_id = %customer_id))]
    pub async fn save_passport(
        &self,
        customer_id: &CustomerId,
        passport: &Passport,
    ) -> Result<(), RemoteError> {
        let value = serde_json::to_string(passport)
            .map_err(|e| RemoteError::Api(format!("unserializable passport: {e}")))?;

        let variables = json!({
            "metafields": [{
                "ownerId": customer_gid(customer_id),
                "namespace": PASSPORT_NAMESPACE,
                "key": PASSPORT_KEY,
                "type": "json",
                "value": value,
            }],
        });

        let data: MetafieldsSetData = self.execute(SAVE_PASSPORT_MUTATION, variables).await?;

        let payload = data
            .metafields_set
            .ok_or_else(|| RemoteError::Api("no metafieldsSet payload".to_string()))?;

        if !payload.user_errors.is_empty() {
            let message = payload
                .user_errors
                .iter()
                .map(|e| {
                    let field = e.field.as_ref().map_or_else(String::new, |f| f.join("."));
                    format!("{}: {}", field, e.message)
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(RemoteError::Api(message));
        }

        Ok(())
    }
}

/// Build the customer global id from the bare identifier.
fn customer_gid(customer_id: &CustomerId) -> String {
    format!("gid://shopify/Customer/{customer_id}")
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
struct GraphQLRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CustomerMetafieldData {
    customer: Option<CustomerNode>,
}

#[derive(Debug, Deserialize)]
struct CustomerNode {
    metafield: Option<MetafieldNode>,
}

#[derive(Debug, Deserialize)]
struct MetafieldNode {
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetData {
    metafields_set: Option<MetafieldsSetPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetafieldsSetPayload {
    user_errors: Vec<MetafieldUserError>,
}

#[derive(Debug, Deserialize)]
struct MetafieldUserError {
    field: Option<Vec<String>>,
    message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_gid() {
        let id = CustomerId::new("6549243166");
        assert_eq!(customer_gid(&id), "gid://shopify/Customer/6549243166");
    }

    #[test]
    fn test_fetch_response_envelope_deserializes() {
        let body = r#"{
            "data": {
                "customer": {
                    "metafield": { "value": "{\"kenya-aa\":{\"entries\":[]}}" }
                }
            }
        }"#;

        let parsed: GraphQLResponse<CustomerMetafieldData> = serde_json::from_str(body).unwrap();
        let value = parsed
            .data
            .unwrap()
            .customer
            .unwrap()
            .metafield
            .unwrap()
            .value;
        assert_eq!(value, "{\"kenya-aa\":{\"entries\":[]}}");
    }

    #[test]
    fn test_fetch_response_with_missing_metafield() {
        let body = r#"{ "data": { "customer": { "metafield": null } } }"#;

        let parsed: GraphQLResponse<CustomerMetafieldData> = serde_json::from_str(body).unwrap();
        assert!(parsed.data.unwrap().customer.unwrap().metafield.is_none());
    }

    #[test]
    fn test_mutation_user_errors_deserialize() {
        let body = r#"{
            "data": {
                "metafieldsSet": {
                    "metafields": [],
                    "userErrors": [
                        { "field": ["metafields", "0", "value"], "message": "Value is invalid JSON" }
                    ]
                }
            }
        }"#;

        let parsed: GraphQLResponse<MetafieldsSetData> = serde_json::from_str(body).unwrap();
        let payload = parsed.data.unwrap().metafields_set.unwrap();
        assert_eq!(payload.user_errors.len(), 1);
        assert_eq!(payload.user_errors[0].message, "Value is invalid JSON");
    }

    #[test]
    fn test_graphql_error_envelope_deserializes() {
        let body = r#"{ "errors": [ { "message": "Invalid API key or access token" } ] }"#;

        let parsed: GraphQLResponse<CustomerMetafieldData> = serde_json::from_str(body).unwrap();
        assert!(parsed.data.is_none());
        assert_eq!(
            parsed.errors.unwrap()[0].message,
            "Invalid API key or access token"
        );
    }
}
