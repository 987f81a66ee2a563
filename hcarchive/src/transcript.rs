//! Human readable transcript of a conversation.
//!
//! Messages are bucketed per calendar day in the given time zone, and inside
//! a day consecutive messages of one sender form a run whose label is printed
//! once.

use chrono::{NaiveDate, TimeZone};

use crate::models::Message;

pub const LABEL_WIDTH: usize = 30;
pub const LINE_WIDTH: usize = 120;

#[derive(Debug)]
pub struct DayGroup<'a> {
    /// `None` only when no message of the bucket has a parseable date.
    pub date: Option<NaiveDate>,
    pub runs: Vec<SenderRun<'a>>,
}

#[derive(Debug)]
pub struct SenderRun<'a> {
    pub sender: &'a str,
    pub messages: Vec<&'a Message>,
}

/// Splits chronologically ordered messages into day buckets. A new bucket
/// starts whenever a message's local date differs from the running bucket's;
/// messages without a parseable date stay in the running bucket.
pub fn group_by_day<'a, Tz: TimeZone>(messages: &'a [Message], tz: &Tz) -> Vec<DayGroup<'a>> {
    let mut days: Vec<(Option<NaiveDate>, Vec<&'a Message>)> = Vec::new();

    for message in messages {
        let date = message
            .timestamp()
            .map(|timestamp| timestamp.with_timezone(tz).date_naive());

        match days.last_mut() {
            Some((current, bucket)) if date.is_none() || *current == date => bucket.push(message),
            Some((current, bucket)) if current.is_none() => {
                *current = date;
                bucket.push(message);
            }
            _ => days.push((date, vec![message])),
        }
    }

    days.into_iter()
        .map(|(date, messages)| DayGroup {
            date,
            runs: group_by_sender(&messages),
        })
        .collect()
}

pub fn group_by_sender<'a>(messages: &[&'a Message]) -> Vec<SenderRun<'a>> {
    let mut runs: Vec<SenderRun<'a>> = Vec::new();

    for &message in messages {
        let sender = message.sender_label();
        match runs.last_mut() {
            Some(run) if run.sender == sender => run.messages.push(message),
            _ => runs.push(SenderRun {
                sender,
                messages: vec![message],
            }),
        }
    }

    runs
}

/// Re-indents continuation lines under the body column.
pub fn format_body(body: &str) -> String {
    let continuation = format!("\n{} | ", " ".repeat(LABEL_WIDTH));
    body.split('\n').collect::<Vec<_>>().join(&continuation)
}

fn format_day(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%A %B %-d, %Y").to_string())
        .unwrap_or_else(|| "Unknown date".to_string())
}

pub fn render_transcript<Tz: TimeZone>(messages: &[Message], tz: &Tz) -> String {
    let rule = "-".repeat(LINE_WIDTH);
    let mut out = String::new();

    for day in group_by_day(messages, tz) {
        let header = format!("{:^width$}", format_day(day.date), width = LINE_WIDTH);
        out.push_str(header.trim_end());
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');

        for run in &day.runs {
            for (i, message) in run.messages.iter().enumerate() {
                let label = if i == 0 { run.sender } else { "" };
                out.push_str(&format!(
                    "{:<width$} | {}\n",
                    label,
                    format_body(&message.message),
                    width = LABEL_WIDTH
                ));
            }
            out.push_str(&rule);
            out.push('\n');
        }
    }

    out
}
