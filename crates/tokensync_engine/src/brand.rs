//! Brand-scoped views over the shared cache.

use crate::cache::DataCore;
use crate::error::{EngineError, EngineResult};
use crate::transport::DataBridge;
use std::collections::BTreeMap;
use tokensync_model::{
    Asset, AssetFormat, AssetGroup, AssetScale, Brand, Component, ComponentGroup, RenderedAsset,
    Token, TokenGroup, TokenType,
};

/// A brand's slice of a [`DataCore`].
///
/// Holds no data of its own; every call goes through the cache and filters
/// by `brand_id == brand.persistent_id`.
pub struct BrandView<'a, B: DataBridge> {
    core: &'a DataCore<B>,
    brand: Brand,
}

impl<B: DataBridge> DataCore<B> {
    /// Returns a view of `brand`'s content.
    pub fn brand(&self, brand: &Brand) -> BrandView<'_, B> {
        BrandView {
            core: self,
            brand: brand.clone(),
        }
    }
}

impl<'a, B: DataBridge> BrandView<'a, B> {
    /// The brand this view filters by.
    pub fn brand(&self) -> &Brand {
        &self.brand
    }

    fn owns(&self, brand_id: &str) -> bool {
        brand_id == self.brand.persistent_id
    }

    /// Tokens of the brand.
    pub async fn tokens(&self) -> EngineResult<Vec<Token>> {
        let tokens = self.core.tokens().await?;
        Ok(tokens.iter().filter(|t| self.owns(&t.brand_id)).cloned().collect())
    }

    /// Token groups of the brand.
    pub async fn token_groups(&self) -> EngineResult<Vec<TokenGroup>> {
        let groups = self.core.token_groups().await?;
        Ok(groups.iter().filter(|g| self.owns(&g.brand_id)).cloned().collect())
    }

    /// Root group of every token type the brand has.
    pub async fn token_group_trees(&self) -> EngineResult<BTreeMap<TokenType, TokenGroup>> {
        let mut roots = BTreeMap::new();
        for group in self.token_groups().await?.into_iter().filter(|g| g.is_root) {
            if roots.contains_key(&group.token_type) {
                return Err(EngineError::TreeConsistency {
                    id: group.id,
                    token_type: group.token_type,
                    message: "duplicate root group".into(),
                });
            }
            roots.insert(group.token_type, group);
        }
        Ok(roots)
    }

    /// Components of the brand.
    pub async fn components(&self) -> EngineResult<Vec<Component>> {
        let members = self.core.components_and_assets().await?;
        Ok(members
            .components
            .iter()
            .filter(|c| self.owns(&c.brand_id))
            .cloned()
            .collect())
    }

    /// Assets of the brand.
    pub async fn assets(&self) -> EngineResult<Vec<Asset>> {
        let members = self.core.components_and_assets().await?;
        Ok(members
            .assets
            .iter()
            .filter(|a| self.owns(&a.brand_id))
            .cloned()
            .collect())
    }

    /// Component groups of the brand.
    pub async fn component_groups(&self) -> EngineResult<Vec<ComponentGroup>> {
        let groups = self.core.component_and_asset_groups().await?;
        Ok(groups
            .component_groups
            .iter()
            .filter(|g| self.owns(&g.brand_id))
            .cloned()
            .collect())
    }

    /// Asset groups of the brand.
    pub async fn asset_groups(&self) -> EngineResult<Vec<AssetGroup>> {
        let groups = self.core.component_and_asset_groups().await?;
        Ok(groups
            .asset_groups
            .iter()
            .filter(|g| self.owns(&g.brand_id))
            .cloned()
            .collect())
    }

    /// Root asset group of the brand, if any.
    pub async fn asset_group_tree(&self) -> EngineResult<Option<AssetGroup>> {
        Ok(self.asset_groups().await?.into_iter().find(|g| g.is_root))
    }

    /// Renders every asset of the brand.
    pub async fn rendered_assets(
        &self,
        format: AssetFormat,
        scale: AssetScale,
    ) -> EngineResult<Vec<RenderedAsset>> {
        let assets = self.assets().await?;
        let groups = self.asset_groups().await?;
        self.core.render_assets(&assets, &groups, format, scale).await
    }
}
