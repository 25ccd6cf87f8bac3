use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueHint};

use todo_list::{
    CategoryFilter, Completion, LoadStatus, Priority, SUGGESTED_CATEGORIES, StatusFilter,
    TaskEdit, TodoList, logging, output,
};

#[derive(Parser, Debug)]
#[command(name = "todo", author, version, about = "Todo list manager")]
struct Cli {
    /// Main verb. If omitted, `list` is default action.
    #[command(subcommand)]
    verb: Option<Verb>,

    /// JSON document holding the task list.
    #[arg(
        short,
        long,
        env = "TODO_FILE",
        global = true,
        value_hint = ValueHint::FilePath,
        default_value = "todos.json"
    )]
    file: PathBuf,

    /// Log debug output to stderr (`RUST_LOG` takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Verb {
    /// Add a task
    Add {
        task: String,

        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        /// Free-form; see `categories` for suggestions
        #[arg(short, long, default_value = "general")]
        category: String,
    },
    /// Show tasks, optionally filtered
    List {
        /// all, pending or completed
        #[arg(short, long, default_value = "all")]
        status: StatusFilter,

        /// `all` or an exact category name
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,

        #[arg(long)]
        json: bool,
    },
    /// Mark a task as completed
    Complete { id: u64 },
    /// Change fields of a task
    Edit {
        id: u64,

        #[arg(short, long)]
        task: Option<String>,

        #[arg(short, long)]
        priority: Option<Priority>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(long)]
        completed: Option<bool>,
    },
    /// Delete a task
    Delete {
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Delete every task
    Clear {
        #[arg(short, long)]
        yes: bool,
    },
    /// Completion and category statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Print the suggested categories
    Categories,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let (mut list, status) = TodoList::open(&cli.file);
    match status {
        LoadStatus::Corrupt => eprintln!(
            "warning: could not read {}, starting with an empty list",
            cli.file.display()
        ),
        LoadStatus::Partial { skipped } => eprintln!(
            "warning: skipped {skipped} unreadable task(s) in {}",
            cli.file.display()
        ),
        LoadStatus::Missing | LoadStatus::Loaded => {}
    }

    match cli.verb.unwrap_or(Verb::List {
        status: StatusFilter::All,
        category: CategoryFilter::All,
        json: false,
    }) {
        Verb::Add {
            task,
            priority,
            category,
        } => {
            let task = list.add(&task, priority, &category)?;
            println!("Added: {} (id {})", task.text, task.id);
        }
        Verb::List {
            status,
            category,
            json,
        } => {
            let view = list.filter(status, &category);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", output::format_table(&view));
            }
        }
        Verb::Complete { id } => match list.complete(id)? {
            Completion::Completed(task) => println!("Completed: {}", task.text),
            Completion::AlreadyCompleted(task) => {
                println!("Todo is already completed: {}", task.text)
            }
        },
        Verb::Edit {
            id,
            task,
            priority,
            category,
            completed,
        } => {
            let edit = TaskEdit {
                text: task,
                priority,
                category,
                completed,
            };
            list.edit(id, edit)?;
            println!("Todo updated successfully!");
        }
        Verb::Delete { id, yes } => {
            let text = list
                .get(id)
                .map(|t| t.text.clone())
                .ok_or(todo_list::TodoError::NotFound(id))?;
            if yes || confirm(&format!("Delete: {text}?"))? {
                list.delete(id)?;
                println!("Deleted: {text}");
            }
        }
        Verb::Clear { yes } => {
            if list.tasks().is_empty() {
                println!("No todos to clear!");
            } else if yes || confirm("Clear ALL todos? This cannot be undone!")? {
                list.clear_all()?;
                println!("All todos cleared!");
            }
        }
        Verb::Stats { json } => {
            let stats = list.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", output::format_stats(&stats));
            }
        }
        Verb::Categories => {
            for category in SUGGESTED_CATEGORIES {
                println!("{category}");
            }
        }
    }
    Ok(())
}

/// Ask a yes/no question on stdin; anything but `y`/`yes` declines.
fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush().context("flushing prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("reading confirmation")?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}
