use crate::command::{Command, CommandContext, CommandError};
use crate::config::Settings;
use crate::gateway::{Embed, EmbedField, Reply};

const HELP_COLOUR: u32 = 0x0099ff;

fn line(settings: &Settings, command: Command, what: &str) -> String {
    format!("`{}` - {}", command.usage(&settings.prefix), what)
}

pub fn help_embed(settings: &Settings) -> Embed {
    let limits = &settings.limits;

    let channel_commands = [
        line(
            settings,
            Command::CreateChannels,
            &format!("Create multiple channels (up to {})", limits.max_channels),
        ),
        line(
            settings,
            Command::DeleteChannels,
            "Delete channels matching pattern (asks for confirmation)",
        ),
        line(
            settings,
            Command::ListChannels,
            "List channels (optionally filtered)",
        ),
    ];

    let message_commands = [
        line(
            settings,
            Command::BulkMessage,
            &format!(
                "Send message to matching channels (up to {} chars)",
                limits.max_message_len
            ),
        ),
        line(
            settings,
            Command::SpamMessage,
            &format!(
                "Send multiple messages per channel (up to {} per channel)",
                limits.max_repeats
            ),
        ),
        line(
            settings,
            Command::Announce,
            &format!(
                "Send announcement to all text channels (up to {} chars)",
                limits.max_message_len
            ),
        ),
    ];

    Embed {
        title: "🤖 Discord Server Management Bot".to_string(),
        description: "Admin-only bot for mass channel operations and bulk messaging".to_string(),
        colour: HELP_COLOUR,
        fields: vec![
            EmbedField {
                name: "📁 Channel Commands".to_string(),
                value: channel_commands.join("\n"),
                inline: false,
            },
            EmbedField {
                name: "📢 Message Commands".to_string(),
                value: message_commands.join("\n"),
                inline: false,
            },
            EmbedField {
                name: "🔧 Utility Commands".to_string(),
                value: line(settings, Command::Help, "Show this help message"),
                inline: false,
            },
            EmbedField {
                name: "⚠️ Safety Notes".to_string(),
                value: [
                    format!(
                        "• Deletion commands require confirmation within {} seconds",
                        settings.confirm_window.as_secs()
                    ),
                    "• All operations are logged".to_string(),
                    "• Rate limiting prevents API abuse".to_string(),
                    "• Only administrators can use commands".to_string(),
                ]
                .join("\n"),
                inline: false,
            },
        ],
        footer: Some("Use commands responsibly • Bot created for server management".to_string()),
    }
}

pub async fn show_help(ctx: &CommandContext<'_>) -> Result<(), CommandError> {
    ctx.send(Reply::Embed(help_embed(ctx.settings))).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_lists_every_command_with_prefix() {
        let settings = Settings {
            prefix: "?".to_string(),
            ..Settings::default()
        };
        let embed = help_embed(&settings);
        let text: String = embed
            .fields
            .iter()
            .map(|f| f.value.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        for command in [
            "?createchannels <name> <count>",
            "?deletechannels <pattern> [confirm]",
            "?listchannels [pattern]",
            "?bulkmessage <pattern> <message>",
            "?spammessage <pattern> <count> <message>",
            "?announce <message>",
            "?help",
        ] {
            assert!(text.contains(command), "missing {}", command);
        }
        assert!(text.contains("up to 300"));
        assert!(text.contains("up to 4000 chars"));
        assert_eq!(embed.colour, 0x0099ff);
        assert_eq!(embed.fields.len(), 4);
    }
}
