use poise::serenity_prelude::Permissions;

/// Only guild administrators may use the bot.
pub fn is_authorized(permissions: Permissions) -> bool {
    permissions.administrator()
}
