// FlightDeck REST API HTTP client
//
// Base path: https://flightdeck.aceiot.cloud/api/
// Auth: Authorization: Bearer <jwt>

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::models::{FdPoint, FdPointWrite, FdSample, FdSite, Paginated, PointsBody, Timeseries};
use crate::error::{Error, preview};
use crate::transport::TransportConfig;

// ── Error response shape ─────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the FlightDeck inventory API.
pub struct FlightDeckClient {
    http: reqwest::Client,
    base_url: Url,
}

impl FlightDeckClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a JWT. The token is sent as a sensitive default header.
    pub fn from_token(
        base_url: &str,
        jwt: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", jwt.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid JWT header value: {e}"),
            })?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
        })
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments, percent-encoding each one. Point names
    /// contain `/`, so they must never be joined as raw path text.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<T, Error> {
        debug!("GET {url} params={params:?}");

        let resp = self.http.get(url).query(params).send().await?;
        self.handle_response(resp).await
    }

    async fn put_no_response<B: Serialize + Sync>(
        &self,
        url: Url,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<(), Error> {
        debug!("PUT {url} params={params:?}");

        let resp = self.http.put(url).query(params).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(Self::parse_error(status, resp).await)
        }
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body, 200)),
            body: body.clone(),
        })
    }

    async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::Authentication {
                message: "FlightDeck rejected the JWT".into(),
            };
        }

        let raw = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|e| e.message.or(e.detail))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    preview(&raw, 200).to_owned()
                }
            });

        Error::FlightDeck {
            status: status.as_u16(),
            message,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Sites ────────────────────────────────────────────────────────

    pub async fn get_site(&self, name: &str) -> Result<FdSite, Error> {
        self.get_with_params(self.url(&["sites", name]), &[]).await
    }

    // ── Points ───────────────────────────────────────────────────────

    /// One page of a site's points. `configured_only` restricts the
    /// listing to points flagged for collection.
    pub async fn get_points(
        &self,
        site: &str,
        page: u32,
        per_page: u32,
        configured_only: bool,
    ) -> Result<Paginated<FdPoint>, Error> {
        let listing = if configured_only {
            "configured_points"
        } else {
            "points"
        };
        self.get_with_params(
            self.url(&["sites", site, listing]),
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    /// Batched tag write. With both overwrite flags off the server merges
    /// the given tags into what each point already has.
    pub async fn write_points(
        &self,
        points: &[FdPointWrite],
        overwrite_markers: bool,
        overwrite_tags: bool,
    ) -> Result<(), Error> {
        self.put_no_response(
            self.url(&["points"]),
            &[
                ("overwrite_m_tags", overwrite_markers.to_string()),
                ("overwrite_kv_tags", overwrite_tags.to_string()),
            ],
            &PointsBody { points },
        )
        .await
    }

    // ── Timeseries ───────────────────────────────────────────────────

    /// Samples for one point in `[start, end]` (RFC 3339 strings).
    pub async fn get_timeseries(
        &self,
        point_name: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<FdSample>, Error> {
        let series: Timeseries = self
            .get_with_params(
                self.url(&["points", point_name, "timeseries"]),
                &[
                    ("start_time", start.to_owned()),
                    ("end_time", end.to_owned()),
                ],
            )
            .await?;
        Ok(series.point_samples)
    }
}
