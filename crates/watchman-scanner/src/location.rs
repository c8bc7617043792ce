//! Conversation location gating.

use watchman_signatures::{Location, Signature};
use watchman_slack::Conversation;

/// Whether `signature` may report content found in `conversation`.
///
/// Direct messages, group DMs and private channels each require their
/// location to be declared. Anything else passes.
#[must_use]
pub fn allowed(conversation: &Conversation, signature: &Signature) -> bool {
    let gates = [
        (conversation.is_im, Location::Im),
        (conversation.is_mpim, Location::Mpim),
        (conversation.is_private, Location::Private),
    ];
    gates
        .iter()
        .all(|&(flagged, location)| !flagged || signature.allows_location(location))
}
