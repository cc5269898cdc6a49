//! Slash-command definitions registered in each guild on `READY`.

use attu_discord::model::{
    CHANNEL_GUILD_TEXT, CommandDefinition, OPTION_CHANNEL, OPTION_INTEGER, OPTION_STRING,
    OptionChoice, OptionDefinition,
};

use crate::commands::{AdminOption, DebugOption};

fn option(kind: u8, name: &str, description: &str, required: bool) -> OptionDefinition {
    OptionDefinition {
        kind,
        name: name.to_owned(),
        description: description.to_owned(),
        required,
        choices: Vec::new(),
        channel_types: Vec::new(),
    }
}

fn choices<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<OptionChoice> {
    names
        .into_iter()
        .map(|name| OptionChoice {
            name: name.to_owned(),
            value: name.to_owned(),
        })
        .collect()
}

fn command(name: &str, description: &str, options: Vec<OptionDefinition>) -> CommandDefinition {
    CommandDefinition {
        name: name.to_owned(),
        description: description.to_owned(),
        options,
    }
}

/// Every command the bot answers.
pub fn definitions() -> Vec<CommandDefinition> {
    let mut channel = option(OPTION_CHANNEL, "channel", "Lore channel", false);
    channel.channel_types = vec![CHANNEL_GUILD_TEXT];

    let mut debug_option = option(OPTION_STRING, "option", "What to show", true);
    debug_option.choices = choices(DebugOption::ALL.map(DebugOption::as_str));

    let mut admin_option = option(OPTION_STRING, "option", "What to do", true);
    admin_option.choices = choices(AdminOption::ALL.map(AdminOption::as_str));

    vec![
        command(
            "check_year",
            "Days until the next year, or when a year begins and ends",
            vec![option(OPTION_INTEGER, "year", "Year number", false)],
        ),
        command(
            "link_year",
            "Link to the post that began a year",
            vec![option(OPTION_INTEGER, "year", "Year number", true), channel],
        ),
        command("build_date", "When this bot was built", Vec::new()),
        command("debug", "Bot diagnostics (owner only)", vec![debug_option]),
        command(
            "admin",
            "Bot administration (owner only)",
            vec![
                admin_option,
                option(OPTION_INTEGER, "number", "New epoch length in days", false),
            ],
        ),
        command(
            "wiki_block",
            "Block a wiki account (owner only)",
            vec![
                option(OPTION_STRING, "user", "Wiki user name", true),
                option(OPTION_STRING, "reason", "Block reason", true),
            ],
        ),
    ]
}
