//! Visual positioning presets published by the signing service.
//!
//! Presets never change for a given service and query, so they are cached
//! for the lifetime of the process. The cache is read-through and
//! single-flight: concurrent requests for the same key wait for one fetch.

use crate::adapters::remote::RestPkiClient;
use crate::domain::constants::VISUAL_POSITIONING_PRESETS_PATH;
use crate::domain::visual::{
    AutoPositioning, Container, ManualPositioning, MeasurementUnits, PageTarget, RectangleSize,
    VisualPositioning,
};
use crate::infra::error::{RestPkiError, RestPkiResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio::sync::OnceCell;

/// Read-through cache for preset bodies.
#[async_trait]
pub trait PresetCache: Send + Sync {
    /// Return the cached value for `key`, running `fetch` only on a miss.
    /// A failed fetch is not cached.
    async fn get_or_fetch(
        &self,
        key: &str,
        fetch: BoxFuture<'_, RestPkiResult<Value>>,
    ) -> RestPkiResult<Value>;
}

/// In-memory [`PresetCache`] with one initialisation cell per key
#[derive(Debug, Default)]
pub struct InMemoryPresetCache {
    entries: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl InMemoryPresetCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &str) -> Arc<OnceCell<Value>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key.to_string()).or_default())
    }

    /// Number of keys holding a value
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().filter(|cell| cell.initialized()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PresetCache for InMemoryPresetCache {
    async fn get_or_fetch(
        &self,
        key: &str,
        fetch: BoxFuture<'_, RestPkiResult<Value>>,
    ) -> RestPkiResult<Value> {
        let cell = self.cell(key);
        if let Some(value) = cell.get() {
            log::debug!("Preset cache hit: {key}");
            return Ok(value.clone());
        }
        cell.get_or_try_init(|| fetch).await.cloned()
    }
}

/// Cache shared by every [`PadesVisualPositioningPresets`] built with `new`
pub fn shared_preset_cache() -> Arc<InMemoryPresetCache> {
    static SHARED: OnceLock<Arc<InMemoryPresetCache>> = OnceLock::new();
    Arc::clone(SHARED.get_or_init(|| Arc::new(InMemoryPresetCache::new())))
}

/// Fetches positioning presets through a [`PresetCache`]
#[derive(Clone)]
pub struct PadesVisualPositioningPresets {
    client: RestPkiClient,
    cache: Arc<dyn PresetCache>,
}

impl PadesVisualPositioningPresets {
    /// Use the process-wide cache
    #[must_use]
    pub fn new(client: RestPkiClient) -> Self {
        Self {
            client,
            cache: shared_preset_cache(),
        }
    }

    #[must_use]
    pub fn with_cache(client: RestPkiClient, cache: Arc<dyn PresetCache>) -> Self {
        Self { client, cache }
    }

    /// Signatures stacked as a footnote.
    ///
    /// `page_number` follows [`PageTarget`] numbering (negative counts from
    /// the end); `rows` reserves room for that many rows of signatures.
    ///
    /// # Errors
    /// Returns the remote failure; failures are not cached.
    pub async fn get_footnote(&self, page_number: Option<i32>, rows: Option<u32>) -> RestPkiResult<Value> {
        let mut query = Vec::new();
        if let Some(page_number) = page_number {
            query.push(("pageNumber", page_number.to_string()));
        }
        if let Some(rows) = rows {
            query.push(("rows", rows.to_string()));
        }
        self.get_preset("Footnote", query).await
    }

    /// Signatures on a page appended to the document.
    ///
    /// # Errors
    /// Returns the remote failure; failures are not cached.
    pub async fn get_new_page(&self) -> RestPkiResult<Value> {
        self.get_preset("NewPage", Vec::new()).await
    }

    /// [`Self::get_footnote`], parsed
    ///
    /// # Errors
    /// Also fails when the preset does not describe a valid positioning.
    pub async fn get_footnote_positioning(
        &self,
        page_number: Option<i32>,
        rows: Option<u32>,
    ) -> RestPkiResult<VisualPositioning> {
        VisualPositioning::from_preset(&self.get_footnote(page_number, rows).await?)
    }

    /// [`Self::get_new_page`], parsed
    ///
    /// # Errors
    /// Also fails when the preset does not describe a valid positioning.
    pub async fn get_new_page_positioning(&self) -> RestPkiResult<VisualPositioning> {
        VisualPositioning::from_preset(&self.get_new_page().await?)
    }

    async fn get_preset(&self, segment: &str, query: Vec<(&'static str, String)>) -> RestPkiResult<Value> {
        let path = format!("{VISUAL_POSITIONING_PRESETS_PATH}/{segment}");
        let key = cache_key(self.client.endpoint().as_str(), &path, &query);
        let client = self.client.clone();
        let fetch = Box::pin(async move {
            log::debug!("Fetching positioning preset {path}");
            client.get::<Value>(&path, &query).await
        });
        self.cache.get_or_fetch(&key, fetch).await
    }
}

/// Endpoint plus path plus query joined with `&`
fn cache_key(endpoint: &str, path: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return format!("{endpoint}{path}");
    }
    let query = query
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{endpoint}{path}?{query}")
}

/// Ready-made positionings, from presets or built locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePosition {
    /// Footnote of the last page
    Footnote,
    /// Footnote with 2.54 cm left, right and bottom margins
    FootnoteWithMargins,
    /// Appended page
    NewPage,
    /// Appended page with 2.54 cm margins and 5 x 3 cm rectangles
    NewPageCustomized,
    /// 5 x 3 cm rectangle one inch from the left and bottom of a new page
    Manual,
    /// Bottom-aligned container on the last page, rows 1 cm apart
    CustomAuto,
}

impl SamplePosition {
    /// Resolve to a positioning, fetching presets where needed.
    ///
    /// # Errors
    /// Returns preset fetch failures and invalid preset bodies.
    pub async fn resolve(self, presets: &PadesVisualPositioningPresets) -> RestPkiResult<VisualPositioning> {
        match self {
            SamplePosition::Footnote => presets.get_footnote_positioning(None, None).await,
            SamplePosition::FootnoteWithMargins => {
                let mut position = presets.get_footnote_positioning(None, None).await?;
                let auto = auto_of(&mut position)?;
                auto.container.left = Some(INCH_CM);
                auto.container.bottom = Some(INCH_CM);
                auto.container.right = Some(INCH_CM);
                Ok(position)
            }
            SamplePosition::NewPage => presets.get_new_page_positioning().await,
            SamplePosition::NewPageCustomized => {
                let mut position = presets.get_new_page_positioning().await?;
                let auto = auto_of(&mut position)?;
                auto.container.left = Some(INCH_CM);
                auto.container.top = Some(INCH_CM);
                auto.container.right = Some(INCH_CM);
                auto.signature_rectangle_size = RectangleSize {
                    width: 5.0,
                    height: 3.0,
                };
                Ok(position)
            }
            SamplePosition::Manual => Ok(manual_on_new_page()),
            SamplePosition::CustomAuto => custom_auto_on_last_page(),
        }
    }
}

const INCH_CM: f64 = 2.54;

fn auto_of(position: &mut VisualPositioning) -> RestPkiResult<&mut AutoPositioning> {
    position.auto_mut().ok_or_else(|| {
        RestPkiError::DecodeError("preset does not use automatic positioning".to_string())
    })
}

/// 5 x 3 cm at one inch from the left and bottom of an appended page
#[must_use]
pub fn manual_on_new_page() -> VisualPositioning {
    VisualPositioning::manual(
        PageTarget::NewPage,
        MeasurementUnits::Centimeters,
        ManualPositioning {
            left: INCH_CM,
            bottom: INCH_CM,
            width: 5.0,
            height: 3.0,
        },
    )
}

/// Variable-width, bottom-aligned container on the last page
///
/// # Errors
/// Never fails for the fixed values used here; the result type comes from
/// [`VisualPositioning::auto`].
pub fn custom_auto_on_last_page() -> RestPkiResult<VisualPositioning> {
    VisualPositioning::auto(
        PageTarget::LAST_PAGE,
        MeasurementUnits::Centimeters,
        AutoPositioning {
            container: Container {
                left: Some(INCH_CM),
                right: Some(INCH_CM),
                bottom: Some(INCH_CM),
                height: Some(12.31),
                ..Container::default()
            },
            signature_rectangle_size: RectangleSize {
                width: 5.0,
                height: 3.0,
            },
            row_spacing: 1.0,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_cache_key_joins_query_with_ampersand() {
        let key = cache_key(
            "https://pki.rest/",
            "Api/PadesVisualPositioningPresets/Footnote",
            &[("pageNumber", "-1".to_string()), ("rows", "2".to_string())],
        );
        assert_eq!(
            key,
            "https://pki.rest/Api/PadesVisualPositioningPresets/Footnote?pageNumber=-1&rows=2"
        );
    }

    #[tokio::test]
    async fn test_cache_fetches_once_per_key() {
        let cache = InMemoryPresetCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_fetch(
                    "a",
                    Box::pin(async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, RestPkiError>(json!({ "pageNumber": -1 }))
                    }),
                )
                .await
                .unwrap();
            assert_eq!(value["pageNumber"], json!(-1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let cache = InMemoryPresetCache::new();
        let err = cache
            .get_or_fetch(
                "k",
                Box::pin(async { Err::<Value, _>(RestPkiError::TransportError("down".to_string())) }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RestPkiError::TransportError(_)));
        assert!(cache.is_empty());

        let value = cache
            .get_or_fetch("k", Box::pin(async { Ok::<_, RestPkiError>(json!(1)) }))
            .await
            .unwrap();
        assert_eq!(value, json!(1));
    }

    #[test]
    fn test_local_samples() {
        let manual = serde_json::to_value(manual_on_new_page()).unwrap();
        assert_eq!(manual["pageNumber"], json!(0));
        assert_eq!(manual["manual"]["width"], json!(5.0));

        let auto = serde_json::to_value(custom_auto_on_last_page().unwrap()).unwrap();
        assert_eq!(auto["pageNumber"], json!(-1));
        assert_eq!(auto["auto"]["rowSpacing"], json!(1.0));
        assert_eq!(auto["auto"]["container"]["height"], json!(12.31));
    }
}
