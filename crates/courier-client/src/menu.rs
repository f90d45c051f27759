//! Interactive terminal menu.
//!
//! Drives the session from numbered prompts on stdin while the notification
//! loop prints inbound messages as they arrive. A failed operation prints
//! its error and returns to the menu; the session keeps running.

use chrono::{Local, TimeZone};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::error::ClientResult;
use crate::notify::Delivery;
use crate::session::Session;

/// A menu entry, resolved against the session's authentication state.
///
/// Only `Login` and `Quit` exist before authentication; every other digit
/// is unknown there, just as `Login` becomes unknown afterwards.
#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Quit,
    Login,
    ListUsers,
    CreateChannel,
    ListChannels,
    Subscribe,
    Publish,
    DirectMessage,
    Blank,
    Unknown,
}

fn parse_choice(input: &str, authenticated: bool) -> Choice {
    match (input, authenticated) {
        ("", _) => Choice::Blank,
        ("0", _) => Choice::Quit,
        ("1", false) => Choice::Login,
        ("2", true) => Choice::ListUsers,
        ("3", true) => Choice::CreateChannel,
        ("4", true) => Choice::ListChannels,
        ("5", true) => Choice::Subscribe,
        ("6", true) => Choice::Publish,
        ("7", true) => Choice::DirectMessage,
        _ => Choice::Unknown,
    }
}

/// Runs the menu loop until the user quits or stdin closes.
pub async fn run(session: &Session) -> ClientResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_menu(session);

        let Some(choice) = read_line(&mut lines).await? else {
            return Ok(());
        };

        let outcome = match parse_choice(&choice, session.is_authenticated()) {
            Choice::Quit => return Ok(()),
            Choice::Blank => continue,
            Choice::Unknown => {
                println!("unknown option: {}", choice);
                continue;
            }
            Choice::Login => login(session, &mut lines).await,
            Choice::ListUsers => list_users(session).await,
            Choice::CreateChannel => create_channel(session, &mut lines).await,
            Choice::ListChannels => list_channels(session).await,
            Choice::Subscribe => subscribe(session, &mut lines).await,
            Choice::Publish => publish(session, &mut lines).await,
            Choice::DirectMessage => direct_message(session, &mut lines).await,
        };

        if let Err(e) = outcome {
            println!("error: {}", e);
        }
    }
}

fn print_menu(session: &Session) {
    println!();
    match session.identity() {
        Some(user) => {
            println!(
                "logged in as {} (subscribed: {})",
                user,
                session.subscribed().join(", ")
            );
            println!("  2) list users");
            println!("  3) create channel");
            println!("  4) list channels");
            println!("  5) subscribe to channel");
            println!("  6) publish to channel");
            println!("  7) direct message");
        }
        None => {
            println!("  1) log in");
        }
    }
    println!("  0) quit");
}

async fn login(session: &Session, lines: &mut Lines<BufReader<Stdin>>) -> ClientResult<()> {
    let Some(username) = ask(lines, "username").await? else {
        return Ok(());
    };
    session.login(&username).await?;
    println!("logged in as {}", username);
    Ok(())
}

async fn list_users(session: &Session) -> ClientResult<()> {
    let users = session.list_users().await?;
    for line in render_users(&users, session.identity().as_deref()) {
        println!("{}", line);
    }
    Ok(())
}

async fn create_channel(
    session: &Session,
    lines: &mut Lines<BufReader<Stdin>>,
) -> ClientResult<()> {
    let Some(name) = ask(lines, "channel name").await? else {
        return Ok(());
    };
    session.create_channel(&name).await?;
    println!("channel {} created", name);
    Ok(())
}

async fn list_channels(session: &Session) -> ClientResult<()> {
    let channels = session.list_channels().await?;
    if channels.is_empty() {
        println!("no channels yet");
        return Ok(());
    }
    for line in render_channels(&channels, &session.subscribed()) {
        println!("{}", line);
    }
    Ok(())
}

async fn subscribe(session: &Session, lines: &mut Lines<BufReader<Stdin>>) -> ClientResult<()> {
    let Some(name) = ask(lines, "channel name").await? else {
        return Ok(());
    };
    session.subscribe(&name).await?;
    println!("subscribed to {}", name);
    Ok(())
}

async fn publish(session: &Session, lines: &mut Lines<BufReader<Stdin>>) -> ClientResult<()> {
    let Some(channel) = ask(lines, "channel name").await? else {
        return Ok(());
    };
    let Some(text) = ask(lines, "message").await? else {
        return Ok(());
    };
    session.publish(&channel, &text).await?;
    println!("published to {}", channel);
    Ok(())
}

async fn direct_message(
    session: &Session,
    lines: &mut Lines<BufReader<Stdin>>,
) -> ClientResult<()> {
    let Some(dst) = ask(lines, "recipient").await? else {
        return Ok(());
    };
    let Some(text) = ask(lines, "message").await? else {
        return Ok(());
    };
    session.send_direct(&dst, &text).await?;
    println!("message sent to {}", dst);
    Ok(())
}

async fn ask(
    lines: &mut Lines<BufReader<Stdin>>,
    label: &str,
) -> ClientResult<Option<String>> {
    println!("{}:", label);
    read_line(lines).await
}

/// Reads one trimmed line; `None` means stdin closed.
async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> ClientResult<Option<String>> {
    Ok(lines.next_line().await?.map(|line| line.trim().to_string()))
}

/// Prints a matched notification. Called from the delivery printer task.
pub fn print_delivery(delivery: &Delivery) {
    match delivery {
        Delivery::Channel {
            channel,
            user,
            text,
            timestamp,
        } => {
            println!(
                "[{}] #{} {}: {}",
                format_timestamp(*timestamp),
                channel,
                user,
                text
            );
        }
        Delivery::Direct {
            from,
            text,
            timestamp,
        } => {
            println!("[{}] (dm) {}: {}", format_timestamp(*timestamp), from, text);
        }
    }
}

fn render_users(users: &[String], me: Option<&str>) -> Vec<String> {
    users
        .iter()
        .map(|user| {
            if Some(user.as_str()) == me {
                format!("  {} (you)", user)
            } else {
                format!("  {}", user)
            }
        })
        .collect()
}

fn render_channels(channels: &[String], subscribed: &[String]) -> Vec<String> {
    channels
        .iter()
        .map(|channel| {
            if subscribed.contains(channel) {
                format!("  {} (subscribed)", channel)
            } else {
                format!("  {}", channel)
            }
        })
        .collect()
}

/// Formats an epoch-seconds timestamp in local time.
fn format_timestamp(epoch: i64) -> String {
    match Local.timestamp_opt(epoch, 0).single() {
        Some(time) => time.format("%H:%M:%S").to_string(),
        None => epoch.to_string(),
    }
}
