use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::remote::{ExperimentResource, Remote, SubjectResource};

/// Blocking REST client for the platform's subject/experiment attribute
/// API. Cloning is cheap; handles hold their own clone.
#[derive(Clone)]
pub struct XnatClient {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

impl XnatClient {
    /// Connect to `host` and verify the credentials with a session probe.
    /// The returned client is the single remote handle for the whole run.
    pub fn connect(host: &str, username: &str, password: &str) -> Result<Self> {
        let base = Url::parse(host.trim_end_matches('/'))
            .with_context(|| format!("invalid host url {host}"))?;
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(60))
            .build()
            .context("building http client")?;

        let this = XnatClient {
            client,
            base,
            username: username.to_string(),
            password: password.to_string(),
        };

        let resp = this
            .client
            .get(this.endpoint(&["data", "JSESSION"])?)
            .basic_auth(&this.username, Some(&this.password))
            .send()
            .with_context(|| format!("connecting to {host}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("authentication to {} failed: {}", host, resp.status()));
        }
        info!(host, user = %this.username, "connected");
        Ok(this)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("host url cannot be a base"))?
            .extend(segments);
        Ok(url)
    }

    fn resource_exists(&self, url: Url) -> Result<bool> {
        let resp = self
            .client
            .get(url.clone())
            .query(&[("format", "json")])
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .with_context(|| format!("querying {url}"))?;
        Ok(resp.status().is_success())
    }

    fn put_attrs(&self, url: Url, attrs: &BTreeMap<String, String>) -> Result<()> {
        let pairs: Vec<(&str, &str)> = attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        debug!(url = %url, fields = attrs.len(), "setting attributes");
        let resp = self
            .client
            .put(url.clone())
            .query(&pairs)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .with_context(|| format!("updating {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("attribute update on {} failed: {}", url, resp.status()));
        }
        Ok(())
    }
}

impl Remote for XnatClient {
    type Subject = HttpSubject;

    fn subject(&self, project: &str, label: &str) -> Result<Self::Subject> {
        Ok(HttpSubject {
            client: self.clone(),
            project: project.to_string(),
            label: label.to_string(),
        })
    }
}

pub struct HttpSubject {
    client: XnatClient,
    project: String,
    label: String,
}

impl HttpSubject {
    fn url(&self) -> Result<Url> {
        self.client
            .endpoint(&["data", "projects", &self.project, "subjects", &self.label])
    }
}

impl SubjectResource for HttpSubject {
    type Experiment = HttpExperiment;

    fn exists(&self) -> Result<bool> {
        self.client.resource_exists(self.url()?)
    }

    fn set_many(&self, attrs: &BTreeMap<String, String>) -> Result<()> {
        self.client.put_attrs(self.url()?, attrs)
    }

    fn experiment(&self, label: &str) -> Result<Self::Experiment> {
        Ok(HttpExperiment {
            client: self.client.clone(),
            project: self.project.clone(),
            subject: self.label.clone(),
            label: label.to_string(),
        })
    }
}

pub struct HttpExperiment {
    client: XnatClient,
    project: String,
    subject: String,
    label: String,
}

impl HttpExperiment {
    fn url(&self) -> Result<Url> {
        self.client.endpoint(&[
            "data",
            "projects",
            &self.project,
            "subjects",
            &self.subject,
            "experiments",
            &self.label,
        ])
    }
}

impl ExperimentResource for HttpExperiment {
    fn exists(&self) -> Result<bool> {
        self.client.resource_exists(self.url()?)
    }

    fn xsi_type(&self) -> Result<String> {
        let url = self.url()?;
        let resp = self
            .client
            .client
            .get(url.clone())
            .query(&[("format", "json")])
            .basic_auth(&self.client.username, Some(&self.client.password))
            .send()
            .with_context(|| format!("querying {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("experiment lookup on {} failed: {}", url, resp.status()));
        }
        let body: Value = resp.json().context("parsing experiment json")?;
        body.pointer("/items/0/meta/xsi:type")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("experiment {} has no xsi:type in response", self.label))
    }

    fn set_many(&self, attrs: &BTreeMap<String, String>) -> Result<()> {
        self.client.put_attrs(self.url()?, attrs)
    }
}
