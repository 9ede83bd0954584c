//! Read-mutate-save retry helper
//!
//! The template never retries internally; this is the caller-side loop
//! for the common contended-counter shape: re-read the entity, reapply
//! the mutation, save, and go again only when the failure was the
//! optimistic-locking kind. Every other error propagates immediately.

use crate::template::DocumentTemplate;
use sediment_core::{DocumentStore, Error, Result};
use sediment_mapping::Entity;
use tracing::debug;

/// Load the entity under `id`, apply `mutate`, and save, retrying the
/// whole read-mutate-save cycle on optimistic-locking failures up to
/// `max_attempts` times.
///
/// Returns the successfully saved entity. An absent key is
/// `Error::NotFound`; exhausting the attempts is `Error::OptimisticLocking`.
pub fn save_with_retry<S, T, M>(
    template: &DocumentTemplate<S>,
    id: &str,
    max_attempts: u32,
    mut mutate: M,
) -> Result<T>
where
    S: DocumentStore,
    T: Entity,
    M: FnMut(&mut T),
{
    for attempt in 1..=max_attempts {
        let mut entity: T = template
            .find_by_id(id)?
            .ok_or_else(|| Error::NotFound { key: id.to_string() })?;
        mutate(&mut entity);
        match template.save(&mut entity) {
            Ok(()) => return Ok(entity),
            Err(err) if err.is_optimistic_locking() => {
                debug!(key = %id, attempt, "contended save, retrying");
            }
            Err(err) => return Err(err),
        }
    }
    Err(Error::OptimisticLocking(format!(
        "{id}: gave up after {max_attempts} attempts"
    )))
}
