//! Read-through cache over the data bridge.
//!
//! Every category sits behind its own async mutex. The first caller finding
//! the category unsynced populates it while holding the lock; callers queued
//! behind it either see the synced snapshot or, if that attempt failed, the
//! same error. A later call retries.

use crate::error::{EngineError, EngineResult};
use crate::transport::{endpoints, DataBridge};
use crate::upstream::{self, ComponentAndAssetGroups, ComponentsAndAssets};
use parking_lot::Mutex as FlightLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokensync_model::{
    Asset, AssetFormat, AssetGroup, AssetScale, Component, ComponentGroup,
    ComponentGroupRemoteModel, ComponentRemoteModel, CustomBlock, DesignSystemVersion,
    DocumentationConfiguration, DocumentationGroupModel, DocumentationItem, DocumentationModel,
    DocumentationPageModel, Exporter, ExporterConfigurationProperty, RenderedAsset,
    RenderedAssetModel, Token, TokenGroup, TokenGroupRemoteModel, TokenRemoteModel,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// A cached resource category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Tokens.
    Tokens,
    /// Token groups.
    TokenGroups,
    /// Components and the asset subset.
    ComponentsAndAssets,
    /// Component and asset groups. Requires [`Category::ComponentsAndAssets`].
    ComponentAndAssetGroups,
    /// Documentation settings.
    Documentation,
    /// Custom block definitions.
    CustomBlocks,
    /// Documentation pages and groups. Requires [`Category::CustomBlocks`]
    /// and [`Category::Documentation`].
    DocumentationItems,
}

impl Category {
    /// All categories.
    pub const ALL: [Category; 7] = [
        Category::Tokens,
        Category::TokenGroups,
        Category::ComponentsAndAssets,
        Category::ComponentAndAssetGroups,
        Category::Documentation,
        Category::CustomBlocks,
        Category::DocumentationItems,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Tokens => "tokens",
            Category::TokenGroups => "token groups",
            Category::ComponentsAndAssets => "components and assets",
            Category::ComponentAndAssetGroups => "component and asset groups",
            Category::Documentation => "documentation",
            Category::CustomBlocks => "custom blocks",
            Category::DocumentationItems => "documentation items",
        };
        f.write_str(name)
    }
}

struct Slot<T> {
    synced: bool,
    data: Option<Arc<T>>,
    /// Failed attempt number and its error.
    failure: Option<(u64, EngineError)>,
}

#[derive(Default)]
struct Flight {
    attempt: u64,
    in_flight: bool,
}

/// Clears the in-flight flag when the populate future finishes or is dropped.
struct FlightGuard<'a>(&'a FlightLock<Flight>);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().in_flight = false;
    }
}

struct CachedCategory<T> {
    category: Category,
    slot: Mutex<Slot<T>>,
    flight: FlightLock<Flight>,
}

impl<T> CachedCategory<T> {
    fn new(category: Category) -> Self {
        Self {
            category,
            slot: Mutex::new(Slot {
                synced: false,
                data: None,
                failure: None,
            }),
            flight: FlightLock::new(Flight::default()),
        }
    }

    async fn get_or_populate<F, Fut>(&self, cache_enabled: bool, populate: F) -> EngineResult<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        // An attempt already running when we queue up is the one we wait on.
        let joined = {
            let flight = self.flight.lock();
            flight.in_flight.then_some(flight.attempt)
        };

        let mut slot = self.slot.lock().await;
        if slot.synced {
            if let Some(data) = &slot.data {
                debug!(category = %self.category, "cache hit");
                return Ok(Arc::clone(data));
            }
        }
        if let (Some(attempt), Some((failed, err))) = (joined, &slot.failure) {
            if attempt == *failed {
                debug!(category = %self.category, attempt, "sharing failed populate");
                return Err(err.clone());
            }
        }

        let attempt = {
            let mut flight = self.flight.lock();
            flight.attempt += 1;
            flight.in_flight = true;
            flight.attempt
        };
        let _guard = FlightGuard(&self.flight);
        debug!(category = %self.category, attempt, "populating");

        match populate().await {
            Ok(data) => {
                let data = Arc::new(data);
                slot.synced = cache_enabled;
                slot.data = Some(Arc::clone(&data));
                slot.failure = None;
                Ok(data)
            }
            Err(err) => {
                warn!(category = %self.category, attempt, error = %err, "populate failed");
                slot.synced = false;
                slot.failure = Some((attempt, err.clone()));
                Err(err)
            }
        }
    }

    async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        slot.synced = false;
        slot.data = None;
        slot.failure = None;
    }

    async fn is_synced(&self) -> bool {
        self.slot.lock().await.synced
    }
}

#[derive(Deserialize)]
struct PropertyValue {
    key: String,
    value: Value,
}

/// Read-through cache for one design system version.
///
/// One instance per session, shared by reference with every consumer.
pub struct DataCore<B: DataBridge> {
    bridge: Arc<B>,
    version: DesignSystemVersion,
    tokens: CachedCategory<Vec<Token>>,
    token_groups: CachedCategory<Vec<TokenGroup>>,
    components_and_assets: CachedCategory<ComponentsAndAssets>,
    component_and_asset_groups: CachedCategory<ComponentAndAssetGroups>,
    documentation: CachedCategory<DocumentationConfiguration>,
    custom_blocks: CachedCategory<Vec<CustomBlock>>,
    documentation_items: CachedCategory<Vec<DocumentationItem>>,
}

impl<B: DataBridge> DataCore<B> {
    /// Creates an empty cache for `version`.
    pub fn new(bridge: Arc<B>, version: DesignSystemVersion) -> Self {
        Self {
            bridge,
            version,
            tokens: CachedCategory::new(Category::Tokens),
            token_groups: CachedCategory::new(Category::TokenGroups),
            components_and_assets: CachedCategory::new(Category::ComponentsAndAssets),
            component_and_asset_groups: CachedCategory::new(Category::ComponentAndAssetGroups),
            documentation: CachedCategory::new(Category::Documentation),
            custom_blocks: CachedCategory::new(Category::CustomBlocks),
            documentation_items: CachedCategory::new(Category::DocumentationItems),
        }
    }

    /// Returns the bridge.
    pub fn bridge(&self) -> &Arc<B> {
        &self.bridge
    }

    /// Returns the version this cache serves.
    pub fn version(&self) -> &DesignSystemVersion {
        &self.version
    }

    /// All tokens of the version.
    pub async fn tokens(&self) -> EngineResult<Arc<Vec<Token>>> {
        self.tokens
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::TOKENS).await?;
                let models: Vec<TokenRemoteModel> =
                    take_field(&mut payload, endpoints::TOKENS, "tokens")?;
                upstream::resolve_tokens(models)
            })
            .await
    }

    /// All token groups of the version.
    pub async fn token_groups(&self) -> EngineResult<Arc<Vec<TokenGroup>>> {
        self.token_groups
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::TOKEN_GROUPS).await?;
                let models: Vec<TokenGroupRemoteModel> =
                    take_field(&mut payload, endpoints::TOKEN_GROUPS, "groups")?;
                Ok(upstream::resolve_token_groups(models))
            })
            .await
    }

    /// Components together with the asset subset.
    pub async fn components_and_assets(&self) -> EngineResult<Arc<ComponentsAndAssets>> {
        self.components_and_assets
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::COMPONENTS).await?;
                let models: Vec<ComponentRemoteModel> =
                    take_field(&mut payload, endpoints::COMPONENTS, "components")?;
                Ok(upstream::resolve_components_and_assets(&models))
            })
            .await
    }

    /// All components of the version.
    pub async fn components(&self) -> EngineResult<Vec<Component>> {
        Ok(self.components_and_assets().await?.components.clone())
    }

    /// All assets of the version.
    pub async fn assets(&self) -> EngineResult<Vec<Asset>> {
        Ok(self.components_and_assets().await?.assets.clone())
    }

    /// Component groups together with the mirrored asset groups.
    pub async fn component_and_asset_groups(&self) -> EngineResult<Arc<ComponentAndAssetGroups>> {
        // Prerequisite first; its lock is released before ours is taken.
        let members = self.components_and_assets().await?;
        self.component_and_asset_groups
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::COMPONENT_GROUPS).await?;
                let models: Vec<ComponentGroupRemoteModel> =
                    take_field(&mut payload, endpoints::COMPONENT_GROUPS, "groups")?;
                Ok(upstream::resolve_component_groups(&models, &members))
            })
            .await
    }

    /// All component groups of the version.
    pub async fn component_groups(&self) -> EngineResult<Vec<ComponentGroup>> {
        Ok(self.component_and_asset_groups().await?.component_groups.clone())
    }

    /// All asset groups of the version.
    pub async fn asset_groups(&self) -> EngineResult<Vec<AssetGroup>> {
        Ok(self.component_and_asset_groups().await?.asset_groups.clone())
    }

    /// Documentation settings.
    pub async fn documentation(&self) -> EngineResult<Arc<DocumentationConfiguration>> {
        self.documentation
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::DOCUMENTATION).await?;
                let model: DocumentationModel =
                    take_field(&mut payload, endpoints::DOCUMENTATION, "documentation")?;
                Ok(model.settings)
            })
            .await
    }

    /// Custom block definitions.
    pub async fn custom_blocks(&self) -> EngineResult<Arc<Vec<CustomBlock>>> {
        self.custom_blocks
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::CUSTOM_BLOCKS).await?;
                take_field(&mut payload, endpoints::CUSTOM_BLOCKS, "customBlocks")
            })
            .await
    }

    /// Documentation pages and groups.
    pub async fn documentation_items(&self) -> EngineResult<Arc<Vec<DocumentationItem>>> {
        let custom_blocks = self.custom_blocks().await?;
        let configuration = self.documentation().await?;
        self.documentation_items
            .get_or_populate(self.bridge.cache_enabled(), || async {
                let mut payload = self.fetch(endpoints::DOCUMENTATION_ITEMS).await?;
                let pages: Vec<DocumentationPageModel> =
                    take_field(&mut payload, endpoints::DOCUMENTATION_ITEMS, "pages")?;
                let groups: Vec<DocumentationGroupModel> =
                    take_field(&mut payload, endpoints::DOCUMENTATION_ITEMS, "groups")?;
                Ok(upstream::resolve_documentation_items(
                    pages,
                    groups,
                    &custom_blocks,
                    &configuration,
                ))
            })
            .await
    }

    /// Marks `category` unsynced so the next request populates it again.
    pub async fn invalidate(&self, category: Category) {
        debug!(%category, "invalidating");
        match category {
            Category::Tokens => self.tokens.invalidate().await,
            Category::TokenGroups => self.token_groups.invalidate().await,
            Category::ComponentsAndAssets => self.components_and_assets.invalidate().await,
            Category::ComponentAndAssetGroups => {
                self.component_and_asset_groups.invalidate().await
            }
            Category::Documentation => self.documentation.invalidate().await,
            Category::CustomBlocks => self.custom_blocks.invalidate().await,
            Category::DocumentationItems => self.documentation_items.invalidate().await,
        }
    }

    /// Returns true if `category` holds a synced collection.
    pub async fn is_synced(&self, category: Category) -> bool {
        match category {
            Category::Tokens => self.tokens.is_synced().await,
            Category::TokenGroups => self.token_groups.is_synced().await,
            Category::ComponentsAndAssets => self.components_and_assets.is_synced().await,
            Category::ComponentAndAssetGroups => self.component_and_asset_groups.is_synced().await,
            Category::Documentation => self.documentation.is_synced().await,
            Category::CustomBlocks => self.custom_blocks.is_synced().await,
            Category::DocumentationItems => self.documentation_items.is_synced().await,
        }
    }

    /// Renders `assets` and pairs each with its download URL and group.
    ///
    /// Not cached; URLs expire quickly. Every asset must belong to one of
    /// `groups`, and the response must hold exactly one item per asset.
    pub async fn render_assets(
        &self,
        assets: &[Asset],
        groups: &[AssetGroup],
        format: AssetFormat,
        scale: AssetScale,
    ) -> EngineResult<Vec<RenderedAsset>> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }

        let mut owners: HashMap<&str, &str> = HashMap::new();
        for group in groups {
            for asset_id in &group.asset_ids {
                owners.insert(asset_id.as_str(), group.id.as_str());
            }
        }
        let group_ids = assets
            .iter()
            .map(|asset| {
                owners
                    .get(asset.id.as_str())
                    .map(|g| g.to_string())
                    .ok_or_else(|| EngineError::MissingGroupAssignment {
                        entity: "asset",
                        id: asset.id.clone(),
                    })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let body = json!({
            "settings": [{"prefix": "", "suffix": "", "scale": scale, "format": format}],
            "persistentIds": assets.iter().map(|a| a.persistent_id.as_str()).collect::<Vec<_>>(),
        });
        let mut payload = self
            .bridge
            .post_category(
                &self.version.design_system_id,
                &self.version.version_id,
                endpoints::RENDER_ASSETS,
                body,
            )
            .await?;
        let items: Vec<RenderedAssetModel> =
            take_field(&mut payload, endpoints::RENDER_ASSETS, "items")?;
        if items.len() != assets.len() {
            return Err(EngineError::CountMismatch {
                requested: assets.len(),
                received: items.len(),
            });
        }

        let mut seen: HashMap<String, usize> = HashMap::new();
        let rendered = assets
            .iter()
            .zip(items)
            .zip(group_ids)
            .map(|((asset, item), group_id)| {
                let count = seen.entry(item.original_name.to_lowercase()).or_insert(0);
                let previous_duplicates = *count;
                *count += 1;
                RenderedAsset {
                    asset: asset.clone(),
                    group_id,
                    url: item.url,
                    previous_duplicates,
                }
            })
            .collect();
        Ok(rendered)
    }

    /// Configuration properties of an exporter with the user's values applied.
    ///
    /// Not cached. Properties without a user value keep their default.
    pub async fn exporter_configuration_properties(
        &self,
        exporter_id: &str,
    ) -> EngineResult<Vec<ExporterConfigurationProperty>> {
        let exporter_endpoint = endpoints::exporter(exporter_id);
        let mut payload = self.fetch(&exporter_endpoint).await?;
        let exporter: Exporter = take_field(&mut payload, &exporter_endpoint, "exporter")?;

        let values_endpoint = endpoints::exporter_properties(exporter_id);
        let mut payload = self.fetch(&values_endpoint).await?;
        let values: Vec<PropertyValue> = take_field(&mut payload, &values_endpoint, "items")?;
        let mut values: HashMap<String, Value> =
            values.into_iter().map(|v| (v.key, v.value)).collect();

        let properties = exporter
            .contributes
            .configuration
            .into_iter()
            .map(|mut property| {
                let value = values
                    .remove(&property.key)
                    .unwrap_or_else(|| property.default.clone());
                property.update_value(value);
                property
            })
            .collect();
        Ok(properties)
    }

    async fn fetch(&self, endpoint: &str) -> EngineResult<Value> {
        self.bridge
            .fetch_category(
                &self.version.design_system_id,
                &self.version.version_id,
                endpoint,
            )
            .await
    }
}

fn take_field<T: DeserializeOwned>(payload: &mut Value, endpoint: &str, key: &str) -> EngineResult<T> {
    let value = payload
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| EngineError::decode(endpoint, format!("missing field `{key}`")))?;
    serde_json::from_value(value).map_err(|e| EngineError::decode(endpoint, e))
}
