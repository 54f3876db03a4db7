use super::Representation;
use crate::error::{MjdlError, MjdlResult, TrackKind};

/// Pick the representation with the greatest height.
///
/// The first maximal element wins when several share the same height.
pub fn select_video(representations: &[Representation]) -> MjdlResult<&Representation> {
    representations
        .iter()
        .reduce(|best, candidate| {
            if candidate.height > best.height {
                candidate
            } else {
                best
            }
        })
        .ok_or(MjdlError::EmptyRepresentationSet(TrackKind::Video))
}

/// Audio manifests carry a single representation; take the first one.
pub fn select_audio(representations: &[Representation]) -> MjdlResult<&Representation> {
    representations
        .first()
        .ok_or(MjdlError::EmptyRepresentationSet(TrackKind::Audio))
}
