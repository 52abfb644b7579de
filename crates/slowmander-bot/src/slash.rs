//! Conversion of the command tree into Discord application commands.

use crate::error::BotResult;
use poise::serenity_prelude as serenity;
use serenity::{CommandOptionType, CreateCommand, CreateCommandOption};
use slowmander_commands::{ArgumentKind, ArgumentSpec, CommandNode, CommandRegistry};
use slowmander_common::utils::truncate_content;
use slowmander_config::DiscordConfig;
use tracing::{debug, info};

/// Longest description Discord accepts for commands and options.
pub const DESCRIPTION_LIMIT: usize = 100;

const FALLBACK_DESCRIPTION: &str = "No description";

fn description(text: &str) -> String {
    if text.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        truncate_content(text, DESCRIPTION_LIMIT)
    }
}

const fn option_type(kind: ArgumentKind) -> CommandOptionType {
    match kind {
        ArgumentKind::String | ArgumentKind::Emoji => CommandOptionType::String,
        ArgumentKind::Int => CommandOptionType::Integer,
        ArgumentKind::Number => CommandOptionType::Number,
        ArgumentKind::Bool => CommandOptionType::Boolean,
        ArgumentKind::User | ArgumentKind::Member => CommandOptionType::User,
        ArgumentKind::Channel => CommandOptionType::Channel,
        ArgumentKind::Role => CommandOptionType::Role,
    }
}

// Integer bounds only accept non-negative values in the builder.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn argument_option(spec: &ArgumentSpec) -> CreateCommandOption {
    let mut option = CreateCommandOption::new(
        option_type(spec.kind),
        spec.name.clone(),
        description(&spec.description),
    )
    .required(!spec.optional);

    for choice in &spec.choices {
        option = match spec.kind {
            ArgumentKind::Int => match choice.value.parse::<i32>() {
                Ok(value) => option.add_int_choice(choice.label.clone(), value),
                Err(_) => option,
            },
            ArgumentKind::Number => match choice.value.parse::<f64>() {
                Ok(value) => option.add_number_choice(choice.label.clone(), value),
                Err(_) => option,
            },
            _ => option.add_string_choice(choice.label.clone(), choice.value.clone()),
        };
    }

    match spec.kind {
        ArgumentKind::Number => {
            if let Some(min) = spec.min {
                option = option.min_number_value(min);
            }
            if let Some(max) = spec.max {
                option = option.max_number_value(max);
            }
        }
        ArgumentKind::Int => {
            if let Some(min) = spec.min.filter(|min| *min >= 0.0) {
                option = option.min_int_value(min as u64);
            }
            if let Some(max) = spec.max.filter(|max| *max >= 0.0) {
                option = option.max_int_value(max as u64);
            }
        }
        _ => {}
    }
    option
}

fn slash_children(node: &CommandNode) -> Vec<CreateCommandOption> {
    node.as_group()
        .map(|group| {
            group
                .sub_commands()
                .filter(|child| child.info().slash)
                .filter_map(sub_option)
                .collect()
        })
        .unwrap_or_default()
}

fn sub_option(node: &CommandNode) -> Option<CreateCommandOption> {
    match node {
        CommandNode::Leaf(command) => {
            let option = command.args.iter().fold(
                CreateCommandOption::new(
                    CommandOptionType::SubCommand,
                    node.name(),
                    description(node.description()),
                ),
                |option, spec| option.add_sub_option(argument_option(spec)),
            );
            Some(option)
        }
        CommandNode::Group(_) => {
            let children = slash_children(node);
            if children.is_empty() {
                return None;
            }
            let option = children.into_iter().fold(
                CreateCommandOption::new(
                    CommandOptionType::SubCommandGroup,
                    node.name(),
                    description(node.description()),
                ),
                CreateCommandOption::add_sub_option,
            );
            Some(option)
        }
    }
}

fn build_command(node: &CommandNode) -> Option<CreateCommand> {
    let options: Vec<CreateCommandOption> = match node {
        CommandNode::Leaf(command) => command.args.iter().map(argument_option).collect(),
        CommandNode::Group(_) => {
            let children = slash_children(node);
            if children.is_empty() {
                debug!(group = %node.name(), "Skipping group without slash sub-commands");
                return None;
            }
            children
        }
    };

    let command = options.into_iter().fold(
        CreateCommand::new(node.name())
            .description(description(node.description()))
            .dm_permission(!node.guild_only()),
        CreateCommand::add_option,
    );
    Some(command)
}

/// Application commands for every slash-enabled top-level node.
///
/// Groups become sub-command and sub-command-group options; arguments become
/// typed options carrying their required flag, choices and bounds.
pub fn build_commands(registry: &CommandRegistry) -> Vec<CreateCommand> {
    registry
        .commands()
        .filter(|node| node.info().slash)
        .filter_map(build_command)
        .collect()
}

/// Deploys slash commands globally, or to the development guild when one is
/// configured.
pub async fn deploy(
    ctx: &serenity::Context,
    registry: &CommandRegistry,
    discord: &DiscordConfig,
) -> BotResult<()> {
    if !discord.register_slash_commands {
        debug!("Slash command registration disabled");
        return Ok(());
    }

    let commands = build_commands(registry);
    let count = commands.len();
    match discord.dev_guild_id {
        Some(guild) => {
            serenity::GuildId::new(guild.get())
                .set_commands(ctx, commands)
                .await?;
            info!(count, guild_id = %guild, "Registered slash commands in development guild");
        }
        None => {
            serenity::Command::set_global_commands(ctx, commands).await?;
            info!(count, "Registered global slash commands");
        }
    }
    Ok(())
}
