//! Remote object key layout.
//!
//! ```text
//! {aggregate_id}/{item_id}/original.jpg
//! {aggregate_id}/{item_id}/cubemap/{face}.jpg
//! {aggregate_id}/{item_id}/thumbnail.jpg
//! ```

use crate::projection::CubeFace;

/// Content type of every uploaded artifact.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Prefix covering every object of an aggregate.
pub fn aggregate_prefix(aggregate_id: &str) -> String {
    format!("{}/", aggregate_id)
}

/// Prefix covering every object of one item.
pub fn item_prefix(aggregate_id: &str, item_id: &str) -> String {
    format!("{}/{}/", aggregate_id, item_id)
}

pub fn original_key(aggregate_id: &str, item_id: &str) -> String {
    format!("{}original.jpg", item_prefix(aggregate_id, item_id))
}

pub fn face_key(aggregate_id: &str, item_id: &str, face: CubeFace) -> String {
    format!(
        "{}cubemap/{}",
        item_prefix(aggregate_id, item_id),
        face.file_name()
    )
}

pub fn thumbnail_key(aggregate_id: &str, item_id: &str) -> String {
    format!("{}thumbnail.jpg", item_prefix(aggregate_id, item_id))
}

/// Every key uploaded for a fully processed item: original, six faces,
/// thumbnail.
pub fn item_artifact_keys(aggregate_id: &str, item_id: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(8);
    keys.push(original_key(aggregate_id, item_id));
    keys.extend(
        CubeFace::ALL
            .iter()
            .map(|face| face_key(aggregate_id, item_id, *face)),
    );
    keys.push(thumbnail_key(aggregate_id, item_id));
    keys
}
