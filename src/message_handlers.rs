use super::*;

const HELP_TEXT: &str = "Commands:
/tasks <token> - show your tasks
/add <token> <text> - add a task
/delete <token> <number> - delete a task
/edit <token> <number> <text> - replace a task's text
/help - show this help";

const TASKS_USAGE: &str = "Usage: /tasks <token>";
const ADD_USAGE: &str = "Usage: /add <token> <text>";
const DELETE_USAGE: &str = "Usage: /delete <token> <number>";
const EDIT_USAGE: &str = "Usage: /edit <token> <number> <text>";

const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum ChatCommand {
    Help,
    Tasks { token: String },
    Add { token: String, text: String },
    Delete { token: String, position: i64 },
    Edit { token: String, position: i64, text: String },
    Usage(&'static str),
    Unknown,
    Text,
}

pub(super) async fn handle_message(bot: Bot, msg: Message, state: std::sync::Arc<AppState>) -> Result<()> {
    let text = match msg.text() {
        Some(text) => text.to_string(),
        None => return Ok(()),
    };

    let reply = reply_for_text(&state, &text).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

pub(super) fn parse_chat_command(text: &str) -> ChatCommand {
    let Some(cmd) = parse_command(text) else {
        return ChatCommand::Text;
    };
    let (_, args) = split_first_word(text);
    match cmd {
        "start" | "help" => ChatCommand::Help,
        "tasks" => {
            let (token, _) = split_first_word(args);
            if token.is_empty() {
                return ChatCommand::Usage(TASKS_USAGE);
            }
            ChatCommand::Tasks {
                token: token.to_string(),
            }
        }
        "add" => {
            let (token, text) = split_first_word(args);
            if token.is_empty() || text.is_empty() {
                return ChatCommand::Usage(ADD_USAGE);
            }
            ChatCommand::Add {
                token: token.to_string(),
                text: text.to_string(),
            }
        }
        "delete" => {
            let (token, rest) = split_first_word(args);
            let (number, _) = split_first_word(rest);
            match number.parse::<i64>() {
                Ok(position) if !token.is_empty() => ChatCommand::Delete {
                    token: token.to_string(),
                    position,
                },
                _ => ChatCommand::Usage(DELETE_USAGE),
            }
        }
        "edit" => {
            let (token, rest) = split_first_word(args);
            let (number, text) = split_first_word(rest);
            match number.parse::<i64>() {
                Ok(position) if !token.is_empty() && !text.is_empty() => ChatCommand::Edit {
                    token: token.to_string(),
                    position,
                    text: text.to_string(),
                },
                _ => ChatCommand::Usage(EDIT_USAGE),
            }
        }
        _ => ChatCommand::Unknown,
    }
}

pub(super) async fn reply_for_text(state: &AppState, text: &str) -> String {
    let command = parse_chat_command(text);
    debug!("chat command: {}", command_name(&command));
    match command {
        ChatCommand::Help => HELP_TEXT.to_string(),
        ChatCommand::Usage(usage) => usage.to_string(),
        ChatCommand::Unknown => "Unknown command. Use /help".to_string(),
        ChatCommand::Text => "Use /help to see the available commands.".to_string(),
        ChatCommand::Tasks { token } => {
            with_account(state, &token, "listing tasks", |account| async move {
                let reply = match engine::list_items(state.store.as_ref(), account.id).await? {
                    ItemList::Empty => format!("{}, you have no tasks yet.", account.username),
                    ItemList::Items(items) => format_task_list(&account.username, &items),
                };
                Ok::<_, CommandError>(reply)
            })
            .await
        }
        ChatCommand::Add { token, text } => {
            with_account(state, &token, "adding a task", |account| async move {
                let item = engine::add_item(state.store.as_ref(), account.id, &text).await?;
                Ok::<_, CommandError>(format!("Task added for {}: \"{}\"", account.username, item.text))
            })
            .await
        }
        ChatCommand::Delete { token, position } => {
            with_account(state, &token, "deleting a task", |account| async move {
                let item = engine::delete_at(state.store.as_ref(), account.id, position).await?;
                Ok::<_, CommandError>(format!("Task deleted: \"{}\"", item.text))
            })
            .await
        }
        ChatCommand::Edit {
            token,
            position,
            text,
        } => {
            with_account(state, &token, "editing a task", |account| async move {
                let edit = engine::edit_at(state.store.as_ref(), account.id, position, &text).await?;
                Ok::<_, CommandError>(format!(
                    "Task updated:\n\nWas: \"{}\"\nNow: \"{}\"",
                    edit.old, edit.new
                ))
            })
            .await
        }
    }
}

/// Resolves the token, runs `op` for the account and renders any failure.
async fn with_account<F, Fut>(state: &AppState, token: &str, action: &str, op: F) -> String
where
    F: FnOnce(Account) -> Fut,
    Fut: std::future::Future<Output = Result<String, CommandError>>,
{
    let account = match engine::resolve_token(state.store.as_ref(), token).await {
        Ok(Some(account)) => account,
        Ok(None) => return "Invalid token.".to_string(),
        Err(err) => {
            error!("token lookup failed while {}: {:#}", action, err);
            return "Database error, please try again later.".to_string();
        }
    };
    match op(account).await {
        Ok(reply) => reply,
        Err(err) => command_error_reply(&err, action),
    }
}

pub(super) fn command_error_reply(err: &CommandError, action: &str) -> String {
    match err {
        CommandError::EmptyText => "Task text must not be empty.".to_string(),
        CommandError::OutOfRange { count, .. } => {
            format!("Invalid task number. You have {} task(s).", count)
        }
        CommandError::ItemGone => "That task no longer exists. Use /tasks to refresh.".to_string(),
        CommandError::Store(store_err) => {
            error!("store failure while {}: {:#}", action, store_err);
            format!("Database error while {}.", action)
        }
    }
}

/// Lists items one per line, cut short with a "...and N more" note once the
/// reply would exceed Telegram's message limit.
pub(super) fn format_task_list(username: &str, items: &[ListedItem]) -> String {
    let mut reply = format!("Tasks for {}:\n", username);
    let mut len = reply.chars().count();
    for (idx, listed) in items.iter().enumerate() {
        let line = format!("\n{}. {}", listed.position, listed.item.text);
        let line_len = line.chars().count();
        let after = items.len() - idx - 1;
        let reserve = if after == 0 { 0 } else { more_note(after).chars().count() };
        if len + line_len + reserve > MAX_MESSAGE_CHARS {
            reply.push_str(&more_note(items.len() - idx));
            return reply;
        }
        reply.push_str(&line);
        len += line_len;
    }
    reply
}

fn more_note(hidden: usize) -> String {
    format!("\n\n...and {} more.", hidden)
}

fn command_name(command: &ChatCommand) -> &'static str {
    match command {
        ChatCommand::Help => "help",
        ChatCommand::Tasks { .. } => "tasks",
        ChatCommand::Add { .. } => "add",
        ChatCommand::Delete { .. } => "delete",
        ChatCommand::Edit { .. } => "edit",
        ChatCommand::Usage(_) => "usage",
        ChatCommand::Unknown => "unknown",
        ChatCommand::Text => "text",
    }
}
