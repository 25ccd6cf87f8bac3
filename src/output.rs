//! Plain-text rendering of task views and statistics for the terminal.

use crate::{model::Task, query::Stats};

/// Upper-case the first letter of every word and lower-case the rest.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn status_label(task: &Task) -> &'static str {
    if task.completed { "Completed" } else { "Pending" }
}

pub fn format_table(tasks: &[&Task]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<4} | {:<30} | {:<8} | {:<10} | {:<9} | Created\n",
        "ID", "Task", "Priority", "Category", "Status"
    ));
    out.push_str(
        "-----+--------------------------------+----------+------------+-----------+-----------\n",
    );
    for t in tasks {
        out.push_str(&format!(
            "{:<4} | {:<30} | {:<8} | {:<10} | {:<9} | {}\n",
            t.id,
            t.text,
            title_case(t.priority.as_str()),
            title_case(&t.category),
            status_label(t),
            t.created_at.date(),
        ));
    }
    out
}

pub fn format_stats(stats: &Stats) -> String {
    let mut out = String::from("Statistics:\n\n");
    out.push_str(&format!("Total todos: {}\n", stats.total));
    out.push_str(&format!("Completed: {}\n", stats.completed));
    out.push_str(&format!("Pending: {}\n", stats.pending));
    out.push_str(&format!(
        "Completion rate: {:.1}%\n\n",
        stats.completion_rate
    ));
    out.push_str("Categories:\n");
    for c in &stats.category_counts {
        out.push_str(&format!("  {}: {}\n", title_case(&c.category), c.count));
    }
    out
}
