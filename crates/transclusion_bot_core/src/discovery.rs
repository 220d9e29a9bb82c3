use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{WikiSession, decode};
use crate::error::{BotError, BotResult};
use crate::template::TemplateName;

/// Upper bound on pages fetched by the single discovery query.
pub const DISCOVERY_LIMIT: usize = 500;

/// A page transcluding the template, as fetched for editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub id: i64,
    pub title: String,
    pub current_text: String,
    pub edit_token: String,
    pub start_timestamp: String,
}

/// Fetch every page embedding `Template:<template>` together with its text and
/// the credentials needed to edit it.
///
/// Only the first batch of up to [`DISCOVERY_LIMIT`] pages is read; a
/// continuation offered by the server is logged and not followed.
pub fn discover<S: WikiSession>(session: &S, template: &TemplateName) -> BotResult<Vec<WikiPage>> {
    let response = session
        .query(&discovery_params(template))
        .map_err(|error| BotError::discovery(&error))?;
    let payload = decode::<DiscoveryResponse>(response)
        .into_result()
        .map_err(|error| BotError::discovery(&error))?;

    if payload.continuation.is_some() {
        warn!(
            "more than {DISCOVERY_LIMIT} pages transclude {}; only the first batch will be processed",
            template.page_title()
        );
    }

    let query = payload.query.unwrap_or_default();
    let shared_token = query.tokens.and_then(|tokens| tokens.csrftoken);
    let items = query.pages.into_items();
    if items.is_empty() {
        return Err(BotError::NoTranscludingPages {
            template: template.as_str().to_string(),
        });
    }

    let item_count = items.len();
    let mut pages = Vec::with_capacity(item_count);
    for item in items {
        if item.missing.is_some() {
            continue;
        }
        let Some(id) = item.pageid else {
            warn!("skipping {}: no page id returned", item.title);
            continue;
        };
        let Some(current_text) = item.latest_content() else {
            warn!("skipping {}: no revision content returned", item.title);
            continue;
        };
        let edit_token = item
            .edittoken
            .clone()
            .or_else(|| shared_token.clone())
            .ok_or_else(|| {
                BotError::discovery(&anyhow!("response carried no edit token for {}", item.title))
            })?;
        let start_timestamp = item
            .starttimestamp
            .clone()
            .or_else(|| payload.curtimestamp.clone())
            .ok_or_else(|| {
                BotError::discovery(&anyhow!(
                    "response carried no start timestamp for {}",
                    item.title
                ))
            })?;

        pages.push(WikiPage {
            id,
            title: item.title,
            current_text,
            edit_token,
            start_timestamp,
        });
    }

    if pages.is_empty() {
        return Err(BotError::discovery(&anyhow!(
            "no page content returned for the {item_count} pages transcluding {}",
            template.page_title()
        )));
    }
    info!("got {} pages transcluding {}", pages.len(), template.page_title());
    Ok(pages)
}

fn discovery_params(template: &TemplateName) -> Vec<(&'static str, String)> {
    vec![
        ("generator", "embeddedin".to_string()),
        ("geititle", template.page_title()),
        ("geilimit", DISCOVERY_LIMIT.to_string()),
        ("prop", "info|revisions".to_string()),
        ("intoken", "edit".to_string()),
        ("rvprop", "content|timestamp".to_string()),
        ("rvslots", "main".to_string()),
        ("meta", "tokens".to_string()),
        ("curtimestamp", "1".to_string()),
    ]
}

#[derive(Debug, Deserialize, Default)]
struct DiscoveryResponse {
    curtimestamp: Option<String>,
    query: Option<DiscoveryQuery>,
    #[serde(rename = "continue")]
    continuation: Option<Value>,
}

#[derive(Debug, Deserialize, Default)]
struct DiscoveryQuery {
    #[serde(default)]
    pages: PageCollection,
    tokens: Option<TokenPayload>,
}

/// `formatversion=2` returns a list, older servers a map keyed by page id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageCollection {
    List(Vec<PageQueryItem>),
    Map(BTreeMap<String, PageQueryItem>),
}

impl Default for PageCollection {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl PageCollection {
    fn into_items(self) -> Vec<PageQueryItem> {
        match self {
            Self::List(items) => items,
            Self::Map(items) => items.into_values().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageQueryItem {
    pageid: Option<i64>,
    title: String,
    missing: Option<Value>,
    edittoken: Option<String>,
    starttimestamp: Option<String>,
    #[serde(default)]
    revisions: Vec<RevisionQueryItem>,
}

impl PageQueryItem {
    fn latest_content(&self) -> Option<String> {
        let revision = self.revisions.first()?;
        revision
            .slots
            .as_ref()
            .and_then(|slots| slots.main.as_ref())
            .and_then(|main| main.content.clone().or_else(|| main.legacy_content.clone()))
            .or_else(|| revision.content.clone())
            .or_else(|| revision.legacy_content.clone())
    }
}

#[derive(Debug, Deserialize)]
struct RevisionQueryItem {
    slots: Option<RevisionSlotContainer>,
    content: Option<String>,
    #[serde(rename = "*")]
    legacy_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RevisionSlotContainer {
    main: Option<RevisionMainSlot>,
}

#[derive(Debug, Deserialize)]
struct RevisionMainSlot {
    content: Option<String>,
    #[serde(rename = "*")]
    legacy_content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TokenPayload {
    csrftoken: Option<String>,
}
