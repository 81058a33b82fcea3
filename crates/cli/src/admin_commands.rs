use {
    anyhow::{Result, bail},
    clap::Args,
    hookrelay_common::{Author, ChannelId, GuildId, GuildRef, InboundMessage, UserId},
    hookrelay_config::HookrelayConfig,
    hookrelay_gateway::Gateway,
    tracing::warn,
};

#[derive(Args)]
pub struct CommandArgs {
    /// Guild id the settings belong to.
    #[arg(long)]
    guild: u64,

    /// Guild name used in forwarded payloads.
    #[arg(long, default_value = "cli")]
    guild_name: String,

    /// Channel id used for rate limiting `send`.
    #[arg(long, default_value_t = 0)]
    channel: u64,

    /// Plugin command group, e.g. `ifttt` or `ntfy`.
    #[arg(long)]
    plugin: String,

    /// Bot that `allowbot` may refer to, as `<id>:<name>`. Repeatable.
    #[arg(long = "bot", value_parser = parse_bot)]
    bots: Vec<Author>,

    /// Subcommand and arguments, e.g. `url https://ntfy.sh/alerts`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    text: Vec<String>,
}

pub async fn handle_command(config: HookrelayConfig, args: CommandArgs) -> Result<()> {
    if config.store.path.is_none() {
        warn!("no [store] path configured, settings will not outlive this command");
    }
    let gateway = Gateway::from_config(&config).await?;
    if gateway.registry().get(&args.plugin).is_none() {
        bail!(
            "unknown plugin `{}` (available: {})",
            args.plugin,
            gateway.registry().list().join(", ")
        );
    }

    let message = admin_message(gateway.prefix(), &args);
    for reply in gateway.dispatch(&message).await {
        println!("{reply}");
    }
    gateway.shutdown().await;
    Ok(())
}

/// An admin-authored message invoking `<prefix><plugin> <text>`.
fn admin_message(prefix: &str, args: &CommandArgs) -> InboundMessage {
    let text = args.text.join(" ");
    InboundMessage {
        guild: Some(GuildRef {
            id: GuildId(args.guild),
            name: args.guild_name.clone(),
        }),
        channel_id: ChannelId(args.channel),
        author: Author {
            id: UserId(0),
            display_name: "cli".into(),
            bot: false,
        },
        content: format!("{prefix}{} {text}", args.plugin),
        mentions: args.bots.clone(),
        is_command: true,
        author_is_admin: true,
    }
}

fn parse_bot(raw: &str) -> Result<Author, String> {
    let (id, name) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected <id>:<name>, got `{raw}`"))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid bot id `{id}`: {e}"))?;
    Ok(Author {
        id: UserId(id),
        display_name: name.trim().to_string(),
        bot: true,
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn args(text: &[&str]) -> CommandArgs {
        CommandArgs {
            guild: 7,
            guild_name: "Ops".into(),
            channel: 8,
            plugin: "ntfy".into(),
            bots: vec![parse_bot("42:alerts").unwrap()],
            text: text.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn builds_prefixed_admin_message() {
        let message = admin_message("!", &args(&["allowbot", "<@42>"]));
        assert_eq!(message.content, "!ntfy allowbot <@42>");
        assert!(message.author_is_admin);
        assert_eq!(message.resolve_mention("<@42>").unwrap().display_name, "alerts");
    }

    #[test]
    fn bot_argument_format() {
        assert_eq!(parse_bot("9: ci ").unwrap(), Author {
            id: UserId(9),
            display_name: "ci".into(),
            bot: true,
        });
        assert!(parse_bot("ci").is_err());
        assert!(parse_bot("x:ci").is_err());
    }
}
