// SkySpark Haystack API HTTP client
//
// Base path: {server}/api/{project}/
// Auth: HTTP basic on every request
//
// All ops exchange Haystack JSON grids. Error grids returned with HTTP 200
// are surfaced as `Error::Grid`.

use std::collections::BTreeMap;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};
use url::Url;

use super::grid::{Grid, Row};
use super::value::Value;
use crate::error::{Error, preview};
use crate::transport::TransportConfig;

/// Commit mode for the `commit` op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// New records; rows must not carry `id`.
    Add,
    /// Existing records; rows carry `id` and `mod`.
    Update,
}

impl CommitMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
        }
    }
}

/// Async client for one SkySpark project.
pub struct SkysparkClient {
    http: reqwest::Client,
    base_url: Url,
    project: String,
    username: String,
    password: SecretString,
}

impl SkysparkClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client for `project` on the server at `base_url`.
    ///
    /// `base_url` may be given with or without the trailing `/api`.
    pub fn new(
        base_url: &str,
        project: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = transport.build_client_with_headers(headers)?;

        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            project: project.into(),
            username: username.into(),
            password,
        })
    }

    /// Ensure the base URL ends with `/api/` so op paths join cleanly.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let path = url.path().trim_end_matches('/').to_owned();
        if path.ends_with("/api") {
            url.set_path(&format!("{path}/"));
        } else {
            url.set_path(&format!("{path}/api/"));
        }
        Ok(url)
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn op_url(&self, op: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&self.project).push(op);
        }
        url
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get_op(&self, op: &str, params: &[(&str, &str)]) -> Result<Grid, Error> {
        let url = self.op_url(op);
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    async fn post_op(&self, op: &str, grid: &Grid) -> Result<Grid, Error> {
        let url = self.op_url(op);
        debug!("POST {url} rows={}", grid.rows.len());

        let resp = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .json(grid)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response(&self, resp: reqwest::Response) -> Result<Grid, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Authentication {
                message: format!("SkySpark rejected credentials for '{}'", self.username),
            });
        }

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(Error::SkySpark {
                status: status.as_u16(),
                message: if body.is_empty() {
                    status.to_string()
                } else {
                    preview(&body, 200).to_owned()
                },
            });
        }

        let grid: Grid = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body, 200)),
            body: body.clone(),
        })?;

        if let Some((dis, trace)) = grid.error() {
            trace!(?trace, "error grid");
            return Err(Error::Grid { dis, trace });
        }
        Ok(grid)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Reads ────────────────────────────────────────────────────────

    /// Run a Haystack filter query.
    pub async fn read(&self, filter: &str) -> Result<Vec<Row>, Error> {
        Ok(self.get_op("read", &[("filter", filter)]).await?.into_rows())
    }

    pub async fn read_sites(&self) -> Result<Vec<Row>, Error> {
        self.read("site").await
    }

    pub async fn read_equipment(&self) -> Result<Vec<Row>, Error> {
        self.read("equip").await
    }

    pub async fn read_points(&self) -> Result<Vec<Row>, Error> {
        self.read("point").await
    }

    /// The `about` op: a single row describing the server and project.
    pub async fn about(&self) -> Result<Row, Error> {
        self.get_op("about", &[])
            .await?
            .into_rows()
            .into_iter()
            .next()
            .ok_or_else(|| Error::Deserialization {
                message: "about returned an empty grid".into(),
                body: String::new(),
            })
    }

    /// Canonical project timezone: `tz` from `about`, else the zone of
    /// `serverTime`.
    pub async fn project_timezone(&self) -> Result<String, Error> {
        let about = self.about().await?;

        if let Some(tz) = about.get("tz").and_then(Value::as_str) {
            return Ok(tz.to_owned());
        }
        if let Some(Value::DateTime { tz: Some(tz), .. }) = about.get("serverTime") {
            return Ok(tz.clone());
        }
        Err(Error::Deserialization {
            message: "about row carries neither tz nor serverTime".into(),
            body: format!("{about:?}"),
        })
    }

    // ── Commits ──────────────────────────────────────────────────────

    /// Commit rows; returns the rows echoed back with ids and mod stamps.
    pub async fn commit(&self, mode: CommitMode, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        let mut meta = BTreeMap::new();
        meta.insert("commit".to_owned(), Value::str(mode.as_str()));
        let grid = Grid::from_rows(meta, rows);
        Ok(self.post_op("commit", &grid).await?.into_rows())
    }

    pub async fn create_sites(&self, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        self.commit(CommitMode::Add, rows).await
    }

    pub async fn create_equipment(&self, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        self.commit(CommitMode::Add, rows).await
    }

    pub async fn create_points(&self, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        self.commit(CommitMode::Add, rows).await
    }

    pub async fn update_equipment(&self, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        self.commit(CommitMode::Update, rows).await
    }

    pub async fn update_points(&self, rows: Vec<Row>) -> Result<Vec<Row>, Error> {
        self.commit(CommitMode::Update, rows).await
    }

    // ── History ──────────────────────────────────────────────────────

    /// Write `(ts, val)` samples to the history of record `id`.
    pub async fn his_write(&self, id: &str, samples: Vec<(Value, Value)>) -> Result<(), Error> {
        let mut meta = BTreeMap::new();
        meta.insert("id".to_owned(), Value::reference(id));

        let rows = samples
            .into_iter()
            .map(|(ts, val)| Row::from([("ts".to_owned(), ts), ("val".to_owned(), val)]))
            .collect();
        self.post_op("hisWrite", &Grid::from_rows(meta, rows)).await?;
        Ok(())
    }
}
