//! Strategy registry and the dialect-independent materializer.
//!
//! A [`Registry`] maps a `(type, strategy)` pair to a [`StrategyBuilder`].
//! Every dialect builds one registry; a [`Materializer`] owns it together
//! with the run-level settings (full refresh, SQL flavor, temp-name source)
//! and applies the common rendering contract before delegating.

use crate::error::{MaterializeError, MaterializeResult};
use matc_core::{Asset, MaterializationStrategy, MaterializationType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Prefix of staging tables for delete+insert and create+replace swaps
pub const TEMP_TABLE_PREFIX: &str = "__bruin_tmp_";
/// Prefix of staging tables for emulated merges
pub const MERGE_TEMP_PREFIX: &str = "__bruin_merge_tmp_";
/// Prefix of staging tables for SCD2 by column
pub const SCD2_TEMP_PREFIX: &str = "__bruin_scd2_tmp_";
/// Prefix of staging tables for SCD2 by time
pub const SCD2_TIME_TEMP_PREFIX: &str = "__bruin_scd2_time_tmp_";

const TEMP_SUFFIX_LEN: usize = 8;

/// SQL produced for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterializedSql {
    /// One script, possibly holding several `;`-separated statements
    Single(String),
    /// Statements that must be sent as separate batches
    Batch(Vec<String>),
}

impl MaterializedSql {
    /// Flatten into one string, joining batch statements with `sep`
    pub fn joined(&self, sep: &str) -> String {
        match self {
            MaterializedSql::Single(sql) => sql.clone(),
            MaterializedSql::Batch(statements) => statements.join(sep),
        }
    }
}

impl From<String> for MaterializedSql {
    fn from(sql: String) -> Self {
        MaterializedSql::Single(sql)
    }
}

impl From<Vec<String>> for MaterializedSql {
    fn from(statements: Vec<String>) -> Self {
        MaterializedSql::Batch(statements)
    }
}

impl fmt::Display for MaterializedSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined(";\n"))
    }
}

/// Variant of a dialect that shares a registry with its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    Standard,
    /// Postgres registry, Redshift-compatible SCD2 statements
    Redshift,
}

/// Per-render inputs handed to a builder
#[derive(Debug, Clone)]
pub struct BuildContext {
    suffix: String,
    flavor: Flavor,
}

impl BuildContext {
    pub fn new(suffix: impl Into<String>, flavor: Flavor) -> Self {
        Self {
            suffix: suffix.into(),
            flavor,
        }
    }

    /// Random suffix shared by every temp object of this render
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Temp table name, `prefix` followed by the render suffix
    pub fn temp_table(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.suffix)
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }
}

/// Turns an asset and its trimmed query into dialect SQL
pub trait StrategyBuilder: Send + Sync {
    fn build(
        &self,
        asset: &Asset,
        query: &str,
        ctx: &BuildContext,
    ) -> MaterializeResult<MaterializedSql>;
}

impl<F> StrategyBuilder for F
where
    F: Fn(&Asset, &str, &BuildContext) -> MaterializeResult<MaterializedSql> + Send + Sync,
{
    fn build(
        &self,
        asset: &Asset,
        query: &str,
        ctx: &BuildContext,
    ) -> MaterializeResult<MaterializedSql> {
        self(asset, query, ctx)
    }
}

type Key = (MaterializationType, MaterializationStrategy);

/// Immutable `(type, strategy)` to builder map
#[derive(Clone, Default)]
pub struct Registry {
    builders: HashMap<Key, Arc<dyn StrategyBuilder>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a builder, replacing any previous one for the pair
    pub fn with<B>(
        mut self,
        kind: MaterializationType,
        strategy: MaterializationStrategy,
        builder: B,
    ) -> Self
    where
        B: StrategyBuilder + 'static,
    {
        self.builders.insert((kind, strategy), Arc::new(builder));
        self
    }

    pub fn get(
        &self,
        kind: MaterializationType,
        strategy: MaterializationStrategy,
    ) -> Option<&dyn StrategyBuilder> {
        self.builders.get(&(kind, strategy)).map(|b| b.as_ref())
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .builders
            .keys()
            .map(|(kind, strategy)| format!("{}/{}", kind, strategy))
            .collect();
        keys.sort();
        f.debug_struct("Registry").field("pairs", &keys).finish()
    }
}

/// Source of temp-object suffixes
pub type TempNameGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Eight random lowercase ASCII letters
pub fn random_suffix() -> String {
    uuid::Uuid::new_v4()
        .as_bytes()
        .iter()
        .take(TEMP_SUFFIX_LEN)
        .map(|b| (b'a' + b % 26) as char)
        .collect()
}

/// Trim whitespace, then at most one trailing `;`
pub fn trim_query(query: &str) -> &str {
    let query = query.trim();
    query.strip_suffix(';').unwrap_or(query)
}

/// Renders assets through a dialect registry
#[derive(Clone)]
pub struct Materializer {
    registry: Arc<Registry>,
    full_refresh: bool,
    flavor: Flavor,
    separator: &'static str,
    temp_names: TempNameGenerator,
}

impl Materializer {
    pub fn new(registry: Registry, full_refresh: bool) -> Self {
        Self {
            registry: Arc::new(registry),
            full_refresh,
            flavor: Flavor::Standard,
            separator: ";\n",
            temp_names: Arc::new(random_suffix),
        }
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Separator used by [`Materializer::render_sql`] to join batches
    pub fn with_separator(mut self, separator: &'static str) -> Self {
        self.separator = separator;
        self
    }

    /// Replace the temp-name source, e.g. with a fixed value in tests
    pub fn with_temp_names<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.temp_names = Arc::new(generator);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn full_refresh(&self) -> bool {
        self.full_refresh
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Strategy actually dispatched for the asset.
    ///
    /// Under full refresh every table strategy except `ddl` becomes
    /// `create+replace`.
    pub fn effective_strategy(&self, asset: &Asset) -> MaterializationStrategy {
        let mat = &asset.materialization;
        if self.full_refresh
            && mat.kind == MaterializationType::Table
            && mat.strategy != MaterializationStrategy::Ddl
        {
            MaterializationStrategy::CreateReplace
        } else {
            mat.strategy
        }
    }

    /// Materialize `query` for `asset`
    pub fn render(&self, asset: &Asset, query: &str) -> MaterializeResult<MaterializedSql> {
        let query = trim_query(query);
        let mat = &asset.materialization;
        if mat.kind == MaterializationType::None {
            return Ok(MaterializedSql::Single(query.to_string()));
        }

        if self.full_refresh && mat.strategy == MaterializationStrategy::Ddl {
            log::info!(
                "Full refresh detected, but DDL strategy is in use: table {} will NOT be dropped or recreated",
                asset.name
            );
        }

        let strategy = self.effective_strategy(asset);
        let builder = self.registry.get(mat.kind, strategy).ok_or(
            MaterializeError::UnsupportedCombination {
                kind: mat.kind,
                strategy: mat.strategy,
            },
        )?;

        log::debug!(
            "materializing {} as {} with strategy {}",
            asset.name,
            mat.kind,
            strategy
        );
        let ctx = BuildContext::new((self.temp_names)(), self.flavor);
        builder.build(asset, query, &ctx)
    }

    /// Materialize and flatten batches with the dialect separator
    pub fn render_sql(&self, asset: &Asset, query: &str) -> MaterializeResult<String> {
        Ok(self.render(asset, query)?.joined(self.separator))
    }
}

impl fmt::Debug for Materializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Materializer")
            .field("registry", &self.registry)
            .field("full_refresh", &self.full_refresh)
            .field("flavor", &self.flavor)
            .finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
