mod client;
mod display;
mod episode;
mod picker;
mod prompt;


use std::net::TcpListener;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local};
use tracing::info;

use crate::api::types::{CollectionPayload, CollectionType, SubjectType, UserCollection};
use crate::auth::capture_authorization_code;
use crate::cli::{Cli, Command};
use crate::config::Settings;
use crate::paths::credential_file_path;

use self::client::{Client, SearchQuery};
use self::display::{print_calendar, print_collections, print_search, subject_panel};
use self::prompt::{EditAction, choose_edit_action, collection_form, confirm};

pub fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env()?;

    match cli.command {
        Command::Login => {
            run_login(&settings)?;
        }
        Command::Me => run_me(&settings)?,
        Command::List { status } => run_list(&settings, status)?,
        Command::Mark { subject_id } => run_mark(&settings, subject_id)?,
        Command::Unmark { subject_id } => run_unmark(&settings, subject_id)?,
        Command::Edit { subject_id, status } => run_edit(&settings, subject_id, status)?,
        Command::Add { subject_id } => run_add(&settings, subject_id)?,
        Command::Cal => run_calendar(&settings)?,
        Command::Search {
            keywords,
            page,
            subject_type,
            tags,
            score,
            rank,
        } => {
            let query = SearchQuery {
                keywords: (!keywords.is_empty()).then(|| keywords.join(" ")),
                page,
                subject_type,
                tags,
                min_score: score,
                max_rank: rank,
            };
            run_search(&settings, &query)?
        }
        Command::Info { subject_id } => run_info(&settings, subject_id)?,
    }

    Ok(())
}

/// Reuses a stored credential when it is still usable, otherwise runs the
/// browser flow.
fn run_login(settings: &Settings) -> Result<Client> {
    let credential_path = credential_file_path()?;
    if let Some(client) = Client::restore(settings, credential_path.clone()) {
        println!("Already logged in.");
        return Ok(client);
    }
    login_in_browser(settings, credential_path)
}

fn login_in_browser(settings: &Settings, credential_path: PathBuf) -> Result<Client> {
    let url = settings.login_url()?;
    let listener = TcpListener::bind(settings.redirect_addr()).with_context(|| {
        format!(
            "failed to listen on port {} for the login redirect",
            settings.redirect_port
        )
    })?;
    println!("Open this URL in your browser to authorize bgm:\n\n  {url}\n");
    println!("Waiting for the redirect on {} ...", settings.redirect_uri());
    let code = capture_authorization_code(&listener).context("login was not completed")?;

    let mut client = Client::new(settings, credential_path);
    client.authorize(&code)?;
    let user = client.me().context("token was issued but could not be used")?;
    info!(username = %user.username, "logged in");
    println!("Logged in as {}.", user.nickname);
    Ok(client)
}

/// Stored session, or a fresh login when there is none. The stored credential
/// is checked once; a failed restore goes straight to the browser.
fn client_session(settings: &Settings) -> Result<Client> {
    let credential_path = credential_file_path()?;
    match Client::restore(settings, credential_path.clone()) {
        Some(client) => Ok(client),
        None => {
            println!("Login required.");
            login_in_browser(settings, credential_path)
        }
    }
}

fn public_client(settings: &Settings) -> Result<Client> {
    Ok(Client::new(settings, credential_file_path()?))
}

fn run_me(settings: &Settings) -> Result<()> {
    let mut client = client_session(settings)?;
    let user = client.me()?;
    println!("Logged in as {}", user.nickname);
    println!("{}", user.profile_url());
    Ok(())
}

fn run_list(settings: &Settings, status: CollectionType) -> Result<()> {
    let mut client = client_session(settings)?;
    let collections = client.collections(status, SubjectType::Anime)?;
    print_collections(status, &collections);
    Ok(())
}

/// Lets the user choose one anime from a collection list.
fn pick_collection(
    client: &mut Client,
    status: CollectionType,
    title: &str,
) -> Result<Option<UserCollection>> {
    let mut collections = client.collections(status, SubjectType::Anime)?;
    if collections.is_empty() {
        println!("No anime in your {status} list.");
        return Ok(None);
    }
    let options: Vec<String> = collections
        .iter()
        .map(UserCollection::progress_label)
        .collect();
    let Some(index) = picker::pick(title, &options)? else {
        println!("Cancelled.");
        return Ok(None);
    };
    Ok(Some(collections.swap_remove(index)))
}

fn run_mark(settings: &Settings, subject_id: Option<u64>) -> Result<()> {
    let mut client = client_session(settings)?;
    let subject_id = match subject_id {
        Some(id) => id,
        None => match pick_collection(&mut client, CollectionType::Watch, "Watch next episode of")? {
            Some(collection) => collection.subject_id,
            None => return Ok(()),
        },
    };
    mark_next_episode(&client, subject_id)
}

fn mark_next_episode(client: &Client, subject_id: u64) -> Result<()> {
    match client.watch_next_episode(subject_id)? {
        Some(record) => println!("Watched {record}"),
        None => println!("Subject {subject_id} is already fully watched."),
    }
    Ok(())
}

fn run_unmark(settings: &Settings, subject_id: Option<u64>) -> Result<()> {
    let mut client = client_session(settings)?;
    let subject_id = match subject_id {
        Some(id) => id,
        None => match pick_collection(&mut client, CollectionType::Watch, "Unwatch last episode of")?
        {
            Some(collection) => collection.subject_id,
            None => return Ok(()),
        },
    };
    match client.unwatch_last_episode(subject_id)? {
        Some(record) => println!("Unwatched {record}"),
        None => println!("Nothing to unmark for subject {subject_id}."),
    }
    Ok(())
}

fn run_edit(settings: &Settings, subject_id: Option<u64>, status: CollectionType) -> Result<()> {
    let mut client = client_session(settings)?;
    let collection = match subject_id {
        Some(id) => match client.user_collection(id)? {
            Some(collection) => collection,
            None => bail!("subject {id} is not in your collections; add it with `bgm add {id}`"),
        },
        None => match pick_collection(&mut client, status, "Edit collection")? {
            Some(collection) => collection,
            None => return Ok(()),
        },
    };

    match choose_edit_action(&collection)? {
        Some(EditAction::NextEpisode) => mark_next_episode(&client, collection.subject_id),
        Some(EditAction::SetStatus(new_status)) => {
            edit_collection(&client, &collection, new_status)
        }
        None => {
            println!("Cancelled.");
            Ok(())
        }
    }
}

fn edit_collection(
    client: &Client,
    collection: &UserCollection,
    status: CollectionType,
) -> Result<()> {
    let payload = collection_form(Some(collection), status)?;
    submit_edit(
        client,
        collection.subject_id,
        collection.subject.display_name(),
        &payload,
        status,
    )
}

fn submit_edit(
    client: &Client,
    subject_id: u64,
    name: &str,
    payload: &CollectionPayload,
    status: CollectionType,
) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    if !confirm(&format!("Mark {name} as {status}?"), true)? {
        println!("Cancelled.");
        return Ok(());
    }
    client.edit_collection(subject_id, payload)?;
    println!("Marked {status}.");
    Ok(())
}

/// New subjects are added to `watch`; collected ones go through the edit form
/// so existing details are not lost.
fn run_add(settings: &Settings, subject_id: u64) -> Result<()> {
    let mut client = client_session(settings)?;
    let subject = client.subject(subject_id)?;
    let name = subject.display_name().to_string();

    match client.user_collection(subject_id)? {
        None => {
            if !confirm(&format!("Watch {name}?"), true)? {
                println!("Cancelled.");
                return Ok(());
            }
            client.add_collection(subject_id, CollectionType::Watch)?;
            println!("Added {name} to watch.");
        }
        Some(collection) => {
            let payload = collection_form(Some(&collection), CollectionType::Watch)?;
            submit_edit(&client, subject_id, &name, &payload, CollectionType::Watch)?;
        }
    }
    Ok(())
}

fn run_calendar(settings: &Settings) -> Result<()> {
    let days = public_client(settings)?.calendar()?;
    let today = Local::now().weekday().number_from_monday() as u8;
    print_calendar(&days, today);
    Ok(())
}

fn run_search(settings: &Settings, query: &SearchQuery) -> Result<()> {
    let page = public_client(settings)?.search(query)?;
    let title = format!(
        "Search results for \"{}\" tags: [{}]",
        query.keywords.as_deref().unwrap_or(""),
        query.tags.join(", ")
    );
    print_search(&title, &page, query.page);
    Ok(())
}

fn run_info(settings: &Settings, subject_id: u64) -> Result<()> {
    let subject = public_client(settings)?.subject(subject_id)?;
    println!("{}", subject_panel(&subject));
    Ok(())
}
