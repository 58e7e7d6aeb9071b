use anyhow::{Context as _, Result};
use serenity::all::{
    Command, CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption,
    CreateInteractionResponse, CreateInteractionResponseMessage, EventHandler, Interaction, Ready,
};
use serenity::async_trait;
use tracing::{error, info, warn};

use crate::command::quote::{Invocation, QUOTE_COMMAND, QuoteCommand};

/// Sole gateway event listener. Acknowledges each slash command before any
/// other work, adapts it into an [`Invocation`], and logs every fault at
/// this one boundary without suppressing it earlier.
pub struct Handler {
    quote: QuoteCommand,
}

impl Handler {
    pub fn new(quote: QuoteCommand) -> Self {
        Self { quote }
    }

    async fn process(&self, ctx: &Context, interaction: &CommandInteraction) -> Result<()> {
        // Transport contract: the event must be acknowledged before any
        // processing, independent of outcome.
        interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
            )
            .await
            .context("acknowledging slash command")?;

        let text = interaction
            .data
            .options
            .first()
            .and_then(|opt| opt.value.as_str())
            .unwrap_or_default()
            .to_string();

        let invocation = Invocation {
            command: interaction.data.name.clone(),
            text,
            user_name: interaction.user.name.clone(),
            channel: interaction.channel_id,
        };

        let outcome = self.quote.handle(&invocation).await;

        // The reply went to the channel directly, so clear the deferred
        // placeholder either way.
        if let Err(err) = interaction.delete_response(&ctx.http).await {
            warn!(error = ?err, "clearing deferred placeholder failed");
        }

        outcome
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "gateway connection ready");

        let command = CreateCommand::new(QUOTE_COMMAND)
            .description("Candlestick chart and quote summary for a ticker")
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "args", "ticker [duration=30d]")
                    .required(false),
            );

        if let Err(err) = Command::create_global_command(&ctx.http, command).await {
            error!(error = ?err, "registering slash command failed");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction
            && let Err(err) = self.process(&ctx, &command).await
        {
            error!(error = ?err, command = %command.data.name, "slash command handling failed");
        }
    }
}
