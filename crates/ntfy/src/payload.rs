use {
    hookrelay_relay::{Delivery, ForwardError, Notice, PayloadContext, PayloadStrategy},
    reqwest::header::AUTHORIZATION,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct NtfyPayload;

impl PayloadStrategy for NtfyPayload {
    const ID: &'static str = "ntfy";
    const NAME: &'static str = "NTFY";
    const SUPPORTS_HEADERS: bool = true;

    fn build(&self, ctx: &PayloadContext<'_>) -> Result<Delivery, ForwardError> {
        let token = ctx.settings.bearer_token();
        let mut delivery = Delivery::text(ctx.content);

        for (name, value) in &ctx.settings.headers {
            // A configured token replaces any Authorization header.
            if token.is_some() && name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                continue;
            }
            delivery = delivery.with_header(name.as_str(), value.as_str());
        }
        if let Some(token) = token {
            delivery = delivery.with_header(AUTHORIZATION.as_str(), format!("Bearer {token}"));
        }
        Ok(delivery)
    }

    fn notice(&self, notice: Notice<'_>) -> String {
        match notice {
            Notice::UrlSet(url) => format!("NTFY URL set to: {url}"),
            Notice::BotAllowed(bot) => format!("Now listening to messages from bot: {bot}"),
            Notice::BotFilterCleared => "No longer listening to any bot messages.".to_string(),
            Notice::Toggled(enabled) => {
                let status = if enabled { "enabled" } else { "disabled" };
                format!("NTFY functionality is now {status}.")
            },
            Notice::SendDisabled => "NTFY functionality is disabled for this server.".to_string(),
        }
    }
}
