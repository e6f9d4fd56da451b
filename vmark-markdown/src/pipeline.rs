//! The pipeline context: owns the parse cache and the background worker.
//!
//! A host builds one [`Pipeline`] and shares it (usually behind an `Arc`)
//! with everything that converts markdown. Parsing runs
//! preprocess, sniff, cache lookup or parse, then the tree converter;
//! serialization runs the reverse converter and the serializer.
//!
//! The cache is only touched from the caller's context. Offloaded parses are
//! inserted once their result is back, and no lock is held while waiting on
//! the worker. Two concurrent misses for the same key may both parse; the
//! second insert replaces the first.

use crate::cache::{CacheStats, ParseCache};
use crate::common::nested_to_flat::syntax_to_document;
use crate::document::Document;
use crate::error::FormatError;
use crate::formats::markdown::{parse_syntax_tree, serialize_document};
use crate::ir::nodes::Root;
use crate::offload::{OffloadAdapter, OffloadState};
use crate::options::{PipelineConfig, PipelineOptions};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct Pipeline {
    config: PipelineConfig,
    cache: Mutex<ParseCache>,
    offload: OffloadAdapter,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let offload = OffloadAdapter::new(config.offload_threshold_bytes, config.offload_enabled);
        Self::with_offload(config, offload)
    }

    /// A pipeline using a custom offload adapter.
    pub fn with_offload(config: PipelineConfig, offload: OffloadAdapter) -> Self {
        Pipeline {
            cache: Mutex::new(ParseCache::new(config.cache_capacity, config.cache_min_bytes)),
            config,
            offload,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Markdown text to document tree.
    pub fn parse(
        &self,
        source: &str,
        options: Option<&PipelineOptions>,
    ) -> Result<Document, FormatError> {
        let tree = self.syntax_tree(source, options)?;
        self.to_document(&tree, source)
    }

    /// Like [`Pipeline::parse`], running large parses on the background worker.
    pub async fn parse_async(
        &self,
        source: &str,
        options: Option<&PipelineOptions>,
    ) -> Result<Document, FormatError> {
        let cached = self.lock_cache().get(source, options);
        let tree = match cached {
            Some(tree) => tree,
            None => {
                let tree = Arc::new(self.offload.parse(source, options, self.config.strict).await?);
                self.lock_cache().insert(source, options, Arc::clone(&tree));
                tree
            }
        };
        self.to_document(&tree, source)
    }

    /// Document tree to markdown text.
    pub fn serialize(
        &self,
        doc: &Document,
        options: Option<&PipelineOptions>,
    ) -> Result<String, FormatError> {
        serialize_document(doc, options, self.config.strict)
    }

    /// The cached (or freshly parsed) syntax tree of `source`.
    pub fn syntax_tree(
        &self,
        source: &str,
        options: Option<&PipelineOptions>,
    ) -> Result<Arc<Root>, FormatError> {
        if let Some(tree) = self.lock_cache().get(source, options) {
            return Ok(tree);
        }
        // Failures return early and are never cached.
        let tree = Arc::new(parse_syntax_tree(source, options, self.config.strict)?);
        self.lock_cache().insert(source, options, Arc::clone(&tree));
        Ok(tree)
    }

    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    pub fn offload_state(&self) -> OffloadState {
        self.offload.state()
    }

    fn to_document(&self, tree: &Root, source: &str) -> Result<Document, FormatError> {
        syntax_to_document(tree, self.config.strict)
            .map_err(|err| FormatError::parse(err.to_string(), source))
    }

    fn lock_cache(&self) -> MutexGuard<'_, ParseCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Pipeline::new(PipelineConfig::default())
    }
}
