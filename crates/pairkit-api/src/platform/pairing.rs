// Pairing endpoints
//
// Catalog and token calls happen once per attempt at most; the status
// call is issued by the poll timer on every tick.

use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::platform::client::PlatformClient;
use crate::platform::models::{PairingStatus, ProductIdList, TokenResult};

impl PlatformClient {
    /// List the product ids this SDK may pair.
    ///
    /// `GET {base}/pairing/product-ids`
    pub async fn list_product_ids(&self) -> Result<Vec<String>, Error> {
        let url = self.api_url("pairing/product-ids")?;
        debug!("listing supported product ids");
        let envelope = self.get::<ProductIdList>(url).await?;
        envelope
            .result
            .map(|r| r.pid_list)
            .ok_or_else(|| Error::Platform {
                code: envelope.code,
                message: "product id list missing from response".into(),
            })
    }

    /// Issue a fresh pairing token scoped to a home.
    ///
    /// `POST {base}/homes/{home_id}/pairing-token`. The token may come back
    /// empty; callers decide how to treat that.
    pub async fn issue_pairing_token(&self, home_id: &str) -> Result<String, Error> {
        let url = self.segments_url(&["homes", home_id, "pairing-token"])?;
        debug!(home_id, "issuing pairing token");
        let envelope = self
            .post::<TokenResult>(url, &json!({ "homeId": home_id }))
            .await?;
        envelope
            .result
            .map(|r| r.token)
            .ok_or_else(|| Error::Platform {
                code: envelope.code,
                message: "token missing from response".into(),
            })
    }

    /// Poll the pairing status for a token.
    ///
    /// `GET {base}/pairing/{token}/status?pairingStartTime={millis}`.
    /// A response without `result` is not an error here: its `code`
    /// carries the platform verdict.
    pub async fn pairing_status(
        &self,
        token: &str,
        start_time_millis: i64,
    ) -> Result<PairingStatus, Error> {
        let mut url = self.segments_url(&["pairing", token, "status"])?;
        url.query_pairs_mut()
            .append_pair("pairingStartTime", &start_time_millis.to_string());
        debug!("polling pairing status");
        self.get(url).await
    }

    /// Append percent-encoded path segments to the base URL.
    fn segments_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
