//! Remote gateway.
//!
//! A [`Transport`] turns a [`Request`] into raw response text. The
//! [`Gateway`] checks the status line, runs the requested decoder, and
//! offers two concurrency shapes: a single awaited call, and a fan-out
//! batch that waits for every request and returns results in completion
//! order, each paired with the key the caller supplied.
//!
//! Neither shape cancels or times out requests on its own. A request that
//! never completes holds up its batch.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::error::{Error, Result};
use crate::protocol::decode;
use crate::protocol::encode::render_form;
use crate::protocol::{Decoded, Decoder, FieldRecord, HistoryEntry, LinkSet, Relation};

pub use http::{Credentials, HttpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One request against the REST 1.0 interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Path below `REST/1.0/`, e.g. `ticket/42/show`.
    pub path: String,
    pub method: Method,
    pub query: Vec<(String, String)>,
    pub body: Vec<(String, String)>,
    pub decoder: Option<Decoder>,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::Get,
            query: Vec::new(),
            body: Vec::new(),
            decoder: None,
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(path)
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.body.push((name.into(), value.into()));
        self
    }

    /// Form `content` body rendered from `(name, value)` pairs.
    pub fn content<K, V>(self, fields: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.body("content", render_form(fields))
    }

    pub fn decode_with(mut self, decoder: Decoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    pub fn show(id: &str) -> Self {
        Self::get(format!("ticket/{id}/show")).decode_with(Decoder::Show)
    }

    pub fn links(id: &str) -> Self {
        Self::get(format!("ticket/{id}/links/show")).decode_with(Decoder::Links)
    }

    pub fn history(id: &str) -> Self {
        Self::get(format!("ticket/{id}/history")).decode_with(Decoder::HistoryShort)
    }

    pub fn history_long(id: &str) -> Self {
        Self::get(format!("ticket/{id}/history"))
            .query("format", "l")
            .decode_with(Decoder::HistoryLong)
    }

    pub fn history_entry(id: &str, history_id: &str) -> Self {
        Self::get(format!("ticket/{id}/history/id/{history_id}"))
            .decode_with(Decoder::HistoryEntry)
    }

    pub fn description(id: &str) -> Self {
        Self::get(format!("ticket/{id}/history"))
            .query("format", "l")
            .decode_with(Decoder::Description)
    }
}

/// Executes requests and returns raw response text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<String>;
}

/// Reject responses whose `RT/<version> <code> <text>` status line is not 200.
pub fn check_status(text: &str) -> Result<()> {
    let Some(first) = text.lines().next() else {
        return Ok(());
    };
    if !first.starts_with("RT/") {
        return Ok(());
    }

    let mut parts = first.splitn(3, ' ');
    let _version = parts.next();
    let code = parts.next().and_then(|code| code.parse::<u16>().ok());
    let message = parts.next().unwrap_or("").trim().to_string();
    match code {
        Some(200) | None => Ok(()),
        Some(code) => Err(Error::Remote { code, message }),
    }
}

#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Issue one request and wait for its decoded result.
    pub async fn call(&self, request: Request) -> Result<Decoded> {
        tracing::debug!(method = ?request.method, path = %request.path, "request");
        let text = self.transport.execute(&request).await?;
        check_status(&text)?;
        Ok(match request.decoder {
            Some(decoder) => decoder.decode(&text, 0),
            None => Decoded::Raw(text),
        })
    }

    /// Issue every request concurrently and wait for all of them.
    ///
    /// Results come back in completion order, paired with their keys. All
    /// requests run to completion; the first failure observed is returned
    /// afterwards.
    pub async fn batch<K>(&self, requests: Vec<(K, Request)>) -> Result<Vec<(K, Decoded)>> {
        tracing::debug!(size = requests.len(), "batch");
        let mut pending: FuturesUnordered<_> = requests
            .into_iter()
            .map(|(key, request)| async move { (key, self.call(request).await) })
            .collect();

        let mut results = Vec::with_capacity(pending.len());
        let mut first_error = None;
        while let Some((key, result)) = pending.next().await {
            match result {
                Ok(decoded) => results.push((key, decoded)),
                Err(err) => {
                    tracing::debug!(error = %err, "batch request failed");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(results),
        }
    }

    pub async fn show(&self, id: &str) -> Result<FieldRecord> {
        Ok(self.call(Request::show(id)).await?.into_fields())
    }

    pub async fn links(&self, id: &str) -> Result<LinkSet> {
        Ok(self.call(Request::links(id)).await?.into_links())
    }

    /// Link sets for several tickets, keyed by ticket id.
    pub async fn links_batch(&self, ids: &[String]) -> Result<Vec<(String, LinkSet)>> {
        let requests = ids
            .iter()
            .map(|id| (id.clone(), Request::links(id)))
            .collect();
        Ok(self
            .batch(requests)
            .await?
            .into_iter()
            .map(|(id, decoded)| (id, decoded.into_links()))
            .collect())
    }

    pub async fn history(&self, id: &str) -> Result<Vec<(String, String)>> {
        Ok(self.call(Request::history(id)).await?.into_numbered())
    }

    pub async fn history_long(&self, id: &str) -> Result<Vec<HistoryEntry>> {
        Ok(self.call(Request::history_long(id)).await?.into_history())
    }

    pub async fn history_entry(&self, id: &str, history_id: &str) -> Result<FieldRecord> {
        Ok(self
            .call(Request::history_entry(id, history_id))
            .await?
            .into_fields())
    }

    pub async fn description(&self, id: &str) -> Result<Option<String>> {
        Ok(self.call(Request::description(id)).await?.into_description())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<String>> {
        let request = Request::get("search/ticket")
            .query("query", query)
            .query("format", "i")
            .decode_with(Decoder::Search);
        Ok(self.call(request).await?.into_ids())
    }

    /// `(id, subject)` pairs for a search.
    pub async fn search_subjects(&self, query: &str) -> Result<Vec<(String, String)>> {
        let request = Request::get("search/ticket")
            .query("query", query)
            .query("format", "s")
            .decode_with(Decoder::SearchSubjects);
        Ok(self.call(request).await?.into_numbered())
    }

    pub async fn queues(&self) -> Result<Vec<(String, String)>> {
        let request = Request::get("search/queue")
            .query("query", "")
            .query("format", "s")
            .decode_with(Decoder::Queues);
        Ok(self.call(request).await?.into_numbered())
    }

    /// Create a ticket and return its id.
    pub async fn create(
        &self,
        queue: &str,
        subject: &str,
        text: Option<&str>,
        extra: &[(String, String)],
    ) -> Result<String> {
        let mut fields = vec![
            ("id".to_string(), "ticket/new".to_string()),
            ("Queue".to_string(), queue.to_string()),
            ("Subject".to_string(), subject.to_string()),
        ];
        fields.extend(extra.iter().cloned());
        if let Some(text) = text {
            fields.push(("Text".to_string(), text.to_string()));
        }

        let request = Request::post("ticket/new")
            .content(&fields)
            .decode_with(Decoder::Created);
        self.call(request).await?.into_created().ok_or_else(|| {
            Error::OperationFailed(format!("ticket creation in queue {queue} was not acknowledged"))
        })
    }

    /// Overwrite fields on a ticket. Returns the raw acknowledgement.
    pub async fn edit(&self, id: &str, fields: &[(String, String)]) -> Result<String> {
        let request = Request::post(format!("ticket/{id}/edit")).content(fields);
        Ok(self.call(request).await?.into_raw())
    }

    pub async fn comment(&self, id: &str, text: &str) -> Result<String> {
        let request = Request::post(format!("ticket/{id}/comment")).content(&[
            ("id", id),
            ("Action", "comment"),
            ("Text", text),
        ]);
        Ok(self.call(request).await?.into_raw())
    }

    /// Replace the peers of one relation on a ticket.
    ///
    /// The service reports refused writes inside a 200 response, so
    /// anything other than `# Links for ticket <id> updated.` is an error.
    pub async fn set_links(&self, id: &str, relation: Relation, peers: &[String]) -> Result<String> {
        let request =
            Request::post(format!("ticket/{id}/links")).body("content", link_payload(relation, peers));
        let raw = self.call(request).await?.into_raw();
        if decode::links_updated(&raw, 0).as_deref() == Some(id) {
            return Ok(raw);
        }
        let notice = decode::notice(&raw, 0).unwrap_or_else(|| "no acknowledgement".to_string());
        Err(Error::OperationFailed(format!(
            "links of ticket {id} were not updated: {notice}"
        )))
    }

    /// Set the status to resolved, then comment. Strictly in that order.
    pub async fn resolve(&self, id: &str, comment: Option<&str>) -> Result<()> {
        self.edit(id, &[("Status".to_string(), "resolved".to_string())])
            .await?;
        if let Some(text) = comment {
            self.comment(id, text).await?;
        }
        Ok(())
    }
}

/// `Relation: peer peer ...` as sent to the links endpoint.
pub fn link_payload(relation: Relation, peers: &[String]) -> String {
    render_form(&[(relation.as_str(), peers.join(" "))])
}
