//! Canonical-id reconciliation for ranked hits.
//!
//! The ranked index stores documents under the canonical id's decimal text
//! form, but nothing stops foreign or malformed identifiers from appearing
//! there. The canonical id reported to callers is always derived from the
//! native id, never trusted from the deserialized payload, which defends
//! against stale or duplicated ids in the payload body.

use tracing::warn;

use crate::{backend::RankedHit, model::Product};

/// Resolve the canonical id for a ranked hit.
///
/// Hits without a payload are dropped. A native id that is not a decimal
/// integer forces the canonical id to unset rather than propagating backend
/// noise; the record itself is still returned.
pub(crate) fn reconcile(hit: RankedHit) -> Option<Product> {
    let mut product = hit.payload?;

    let is_decimal =
        !hit.native_id.is_empty() && hit.native_id.bytes().all(|b| b.is_ascii_digit());
    if is_decimal {
        match hit.native_id.parse::<u64>() {
            Ok(id) => product.id = Some(id),
            Err(_) => {
                warn!(native_id = %hit.native_id, "Document id overflows the canonical id range");
                product.id = None;
            }
        }
    } else {
        warn!(native_id = %hit.native_id, "Non-numeric document id in ranked index");
        product.id = None;
    }

    Some(product)
}
