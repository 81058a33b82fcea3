use hookrelay_common::{Author, UserId};

/// Bot-author policy for listener-driven forwards.
///
/// Human authors always pass. A bot passes only when it is the one bot the
/// guild allowed with `allowbot`.
pub fn author_allowed(author: &Author, allowed_bot: Option<UserId>) -> bool {
    if !author.bot {
        return true;
    }
    allowed_bot.is_some_and(|id| id == author.id)
}
