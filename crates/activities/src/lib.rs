//! The activity library: every UI-driving operation a workflow node can
//! name, registered by id.
//!
//! Each activity is a thin wrapper over the [`gramflow_session::Page`]
//! trait: it reads its knobs from the node's config map, polls the
//! cancellation token between internal iterations, and maps expected
//! "nothing to do" conditions to a benign outcome tag instead of an error.

pub mod engage;
pub mod message;
pub mod scroll;

pub use engage::{ApproveFollowRequests, FollowUser, LikePost, UnfollowUser};
pub use message::SendMessage;
pub use scroll::{ScrollFeed, ScrollReels};

use gramflow_workflow::ActivityRegistry;
use std::sync::Arc;

/// Register the built-in activity set under its workflow ids.
pub fn register_defaults(registry: &mut ActivityRegistry) {
    registry.register("scroll_feed", Arc::new(ScrollFeed));
    registry.register("scroll_reels", Arc::new(ScrollReels));
    registry.register("like_post", Arc::new(LikePost));
    registry.register("follow_user", Arc::new(FollowUser));
    registry.register("unfollow_user", Arc::new(UnfollowUser));
    registry.register("approve_follow_requests", Arc::new(ApproveFollowRequests));
    registry.register("send_message", Arc::new(SendMessage));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_registers_every_workflow_id() {
        let mut registry = ActivityRegistry::new();
        register_defaults(&mut registry);
        assert_eq!(
            registry.ids(),
            vec![
                "approve_follow_requests",
                "follow_user",
                "like_post",
                "scroll_feed",
                "scroll_reels",
                "send_message",
                "unfollow_user",
            ]
        );
    }
}
