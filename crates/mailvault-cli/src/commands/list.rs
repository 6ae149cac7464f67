use anyhow::Result;
use mailvault_shared::{Message, MessageStatus};
use mailvault_store::MessageStore;

const SUBJECT_WIDTH: usize = 50;
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub async fn run(store: &MessageStore, id: Option<&str>, status: Option<MessageStatus>) -> Result<()> {
    if let Some(id) = id {
        let message = store.get_message(id).await?;
        print!("{}", format_message(&message));
        return Ok(());
    }

    let messages = store.list_messages(status).await?;
    if messages.is_empty() {
        println!("No messages found");
        return Ok(());
    }
    print!("{}", format_table(&messages));
    Ok(())
}

/// Summary table, newest first as returned by the store.
pub fn format_table(messages: &[Message]) -> String {
    let rows: Vec<[String; 6]> = messages
        .iter()
        .map(|m| {
            [
                m.id.clone(),
                m.timestamp.format(DATE_FORMAT).to_string(),
                m.name.clone(),
                m.email.clone(),
                m.status.to_string(),
                m.subject(SUBJECT_WIDTH),
            ]
        })
        .collect();

    let headers = ["ID", "Date", "Name", "Email", "Status", "Subject"];
    let mut widths = headers.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    out.push_str(&format_row(&headers.map(String::from), &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &rows {
        out.push_str(&format_row(row, &widths));
    }

    out.push_str(&format!("\nTotal messages: {}\n", messages.len()));
    out.push_str("Use --id <message-id> to view full message details\n");
    out
}

fn format_row(cells: &[String; 6], widths: &[usize; 6]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    format!("{}\n", padded.join(" | ").trim_end())
}

/// Full view of a single message.
pub fn format_message(message: &Message) -> String {
    let mut out = String::new();
    out.push_str(&format!("Message ID: {}\n", message.id));
    out.push_str(&format!("Date: {}\n", message.timestamp.to_rfc3339()));
    out.push_str(&format!("From: {} <{}>\n", message.name, message.email));
    if let Some(company) = message.company.as_deref().filter(|c| !c.is_empty()) {
        out.push_str(&format!("Company: {company}\n"));
    }
    out.push_str(&format!("Status: {}\n", message.status));
    out.push_str(&format!("IP: {}\n", message.ip));
    out.push_str(&format!("User Agent: {}\n", message.user_agent));
    out.push_str("\nMessage:\n");
    out.push_str(&"-".repeat(SUBJECT_WIDTH));
    out.push('\n');
    out.push_str(&message.message);
    out.push('\n');
    out
}
