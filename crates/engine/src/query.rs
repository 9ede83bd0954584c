//! Result mapping for view and declarative queries
//!
//! View lookups return full documents and map to entities; declarative
//! queries return flat projected rows and map to fragments. A row that
//! fails conversion never aborts its batch: the `find_*` operations log
//! and skip it, while the lower-level `map_*` operations hand back the
//! per-row outcomes for callers that want to see the failures.

use crate::template::{store_error, DocumentTemplate};
use sediment_core::{
    DocumentStore, Payload, QueryExecutor, RawDocument, Result, Value, ViewIndexExecutor,
    ViewQuery,
};
use sediment_mapping::{Entity, Fragment};
use tracing::warn;

impl<S: DocumentStore> DocumentTemplate<S> {
    /// Map raw documents to entities, one outcome per input document,
    /// in input order.
    pub fn map_documents<T: Entity>(&self, docs: &[RawDocument]) -> Vec<Result<T>> {
        docs.iter().map(|doc| self.converter().read(doc)).collect()
    }

    /// Map flat projected rows to fragments, one outcome per input row,
    /// in input order.
    pub fn map_projections<F: Fragment>(&self, rows: &[Payload]) -> Vec<Result<F>> {
        rows.iter()
            .map(|row| self.converter().read_projection(row))
            .collect()
    }

    /// Run a view lookup and map the resulting documents to entities.
    ///
    /// Executor failure aborts the call; a document that fails conversion
    /// is logged and skipped. Result order follows the executor's order.
    pub fn find_by_view<T: Entity>(
        &self,
        executor: &dyn ViewIndexExecutor,
        query: &ViewQuery,
    ) -> Result<Vec<T>> {
        let docs = executor.execute(query).map_err(store_error)?;
        let mut entities = Vec::with_capacity(docs.len());
        for doc in &docs {
            match self.converter().read(doc) {
                Ok(entity) => entities.push(entity),
                Err(err) => {
                    warn!(key = %doc.id, %err, "skipping unconvertible view row")
                }
            }
        }
        Ok(entities)
    }

    /// Run a declarative query and map its rows to projection fragments.
    ///
    /// Same failure policy as [`find_by_view`](Self::find_by_view): the
    /// executor's failure aborts, an unconvertible row is logged and
    /// skipped.
    pub fn find_by_query<F: Fragment>(
        &self,
        executor: &dyn QueryExecutor,
        statement: &str,
        params: &[Value],
    ) -> Result<Vec<F>> {
        let rows = executor.execute(statement, params).map_err(store_error)?;
        let mut fragments = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match self.converter().read_projection(row) {
                Ok(fragment) => fragments.push(fragment),
                Err(err) => warn!(row = index, %err, "skipping unconvertible query row"),
            }
        }
        Ok(fragments)
    }
}
