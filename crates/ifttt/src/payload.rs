use {
    hookrelay_relay::{Delivery, ForwardError, PayloadContext, PayloadStrategy},
    serde::Serialize,
};

/// The three ingredients an IFTTT applet receives.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IftttValues<'a> {
    /// Guild name.
    pub value1: &'a str,
    /// Author display name.
    pub value2: &'a str,
    /// Sanitized message.
    pub value3: &'a str,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IftttPayload;

impl PayloadStrategy for IftttPayload {
    const ID: &'static str = "ifttt";
    const NAME: &'static str = "IFTTT";

    fn build(&self, ctx: &PayloadContext<'_>) -> Result<Delivery, ForwardError> {
        let values = IftttValues {
            value1: ctx.guild_name,
            value2: ctx.author_name,
            value3: ctx.content,
        };
        let value = serde_json::to_value(values)
            .map_err(|e| ForwardError::InvalidSettings(format!("IFTTT payload: {e}")))?;
        Ok(Delivery::json(value))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use {
        hookrelay_common::{Author, ChannelId, GuildId, GuildRef, InboundMessage, UserId},
        hookrelay_relay::{DeliveryBody, GuildSettings, MemorySettingsStore, RelayPlugin},
        mockito::{Matcher, Server},
    };

    use {super::*, crate::IftttPlugin};

    #[test]
    fn builds_value_triple() {
        let settings = GuildSettings::default();
        let delivery = IftttPayload
            .build(&PayloadContext {
                guild_name: "Lounge",
                author_name: "alice",
                content: "Hello world now",
                settings: &settings,
            })
            .unwrap();

        assert!(delivery.headers.is_empty());
        assert_eq!(
            delivery.body,
            DeliveryBody::Json(serde_json::json!({
                "value1": "Lounge",
                "value2": "alice",
                "value3": "Hello world now",
            }))
        );
    }

    fn message(content: &str) -> InboundMessage {
        InboundMessage {
            guild: Some(GuildRef {
                id: GuildId(100),
                name: "Lounge".into(),
            }),
            channel_id: ChannelId(200),
            author: Author {
                id: UserId(300),
                display_name: "alice".into(),
                bot: false,
            },
            content: content.into(),
            mentions: Vec::new(),
            is_command: false,
            author_is_admin: false,
        }
    }

    #[tokio::test]
    async fn forwards_listener_message_to_webhook() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/trigger/chat/with/key/abc")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "value1": "Lounge",
                "value2": "alice",
                "value3": "Hello world now",
            })))
            .with_status(200)
            .with_body("Congratulations! You've fired the chat event")
            .expect(1)
            .create_async()
            .await;

        let plugin = IftttPlugin::new(IftttPayload, Arc::new(MemorySettingsStore::new()));
        plugin
            .forwarder()
            .update_settings(GuildId(100), |s| {
                s.destination_url = Some(format!("{}/trigger/chat/with/key/abc", server.url()));
            })
            .await
            .unwrap();

        plugin.on_message(&message("Hello <b>world</b>   now")).await;
        plugin.on_message(&message("too soon")).await;
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn token_command_is_not_offered() {
        let plugin = IftttPlugin::new(IftttPayload, Arc::new(MemorySettingsStore::new()));
        let replies = plugin.on_command(&message(""), "token abc").await;
        assert_eq!(replies[0].text, "Unknown subcommand `token`.");
    }
}
