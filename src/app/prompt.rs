use anyhow::Result;
use dialoguer::{Confirm, Input, Select};

use crate::api::types::{CollectionPayload, CollectionType, UserCollection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditAction {
    NextEpisode,
    SetStatus(CollectionType),
}

/// Actions offered for a collected subject: the next episode first, then
/// every status.
pub(crate) fn edit_actions(collection: &UserCollection) -> Vec<(String, EditAction)> {
    let next = collection.ep_status.saturating_add(1);
    let next = if collection.subject.eps == 0 {
        next
    } else {
        next.min(collection.subject.eps)
    };
    let mut actions = vec![(format!("ep.{next}"), EditAction::NextEpisode)];
    actions.extend(
        [
            CollectionType::Done,
            CollectionType::Drop,
            CollectionType::Stash,
            CollectionType::Wish,
            CollectionType::Watch,
        ]
        .into_iter()
        .map(|status| (status.label().to_string(), EditAction::SetStatus(status))),
    );
    actions
}

pub(crate) fn choose_edit_action(collection: &UserCollection) -> Result<Option<EditAction>> {
    let actions = edit_actions(collection);
    let labels: Vec<&str> = actions.iter().map(|(label, _)| label.as_str()).collect();
    let choice = Select::new()
        .with_prompt(format!("Choose an action for {}", collection.subject.display_name()))
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(choice.and_then(|index| actions.get(index).map(|(_, action)| *action)))
}

pub(crate) fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Empty input means no rating.
pub(crate) fn parse_rate(input: &str) -> Result<Option<u8>, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match trimmed.parse::<u8>() {
        Ok(rate) if (1..=10).contains(&rate) => Ok(Some(rate)),
        _ => Err(format!("'{trimmed}' is not a rating between 1 and 10")),
    }
}

pub(crate) fn parse_tags(input: &str) -> Vec<String> {
    input.split_whitespace().map(str::to_string).collect()
}

/// Asks for rating, tags, comment and visibility, starting from the current
/// collection entry when there is one.
pub(crate) fn collection_form(
    current: Option<&UserCollection>,
    status: CollectionType,
) -> Result<CollectionPayload> {
    let mut rate_input = Input::<String>::new()
        .with_prompt("Rate (1-10, empty to clear)")
        .allow_empty(true)
        .validate_with(|input: &String| parse_rate(input).map(|_| ()));
    if let Some(rate) = current.map(|c| c.rate).filter(|rate| *rate > 0) {
        rate_input = rate_input.default(rate.to_string());
    }
    let rate = parse_rate(&rate_input.interact_text()?).unwrap_or(None);

    let tags: String = Input::new()
        .with_prompt("Tags (separated by space)")
        .allow_empty(true)
        .default(current.map(|c| c.tags.join(" ")).unwrap_or_default())
        .interact_text()?;

    let comment: String = Input::new()
        .with_prompt("Comment")
        .allow_empty(true)
        .default(
            current
                .and_then(|c| c.comment.clone())
                .unwrap_or_default(),
        )
        .interact_text()?;

    let private = Confirm::new()
        .with_prompt("Private")
        .default(current.is_some_and(|c| c.private))
        .interact()?;

    Ok(edit_payload(status, rate, &tags, &comment, private))
}

/// Payload for updating an existing collection. Rate and comment are always
/// sent so that blank answers clear them; a rate of 0 removes the rating.
pub(crate) fn edit_payload(
    status: CollectionType,
    rate: Option<u8>,
    tags: &str,
    comment: &str,
    private: bool,
) -> CollectionPayload {
    CollectionPayload {
        collection_type: status.code(),
        rate: Some(rate.unwrap_or(0)),
        comment: Some(comment.trim().to_string()),
        private,
        tags: parse_tags(tags),
    }
}
