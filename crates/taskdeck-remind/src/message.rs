use chrono::NaiveDate;
use taskdeck_core::{Project, Task};

const CALL_TO_ACTION: &str =
    "_Open your task manager and say \"sync my tasks\" to pull in new ones._";

/// Builds the reminder body: date header, grouped task block (or an
/// all-caught-up line), total count, fixed call to action.
pub fn compose(today: NaiveDate, groups: &[(Project, Vec<Task>)]) -> String {
    let mut out = format!(
        "🌅 *Morning task review · {}*\n\n",
        today.format("%A, %-d %B")
    );

    let total: usize = groups.iter().map(|(_, tasks)| tasks.len()).sum();
    if total == 0 {
        out.push_str("✅ All caught up, no open tasks.\n");
    } else {
        for (project, tasks) in groups {
            out.push_str(&format!(
                "{} *{}* ({})\n",
                project.emoji(),
                project.label(),
                tasks.len()
            ));
            for task in tasks {
                out.push_str(&format!("  {} {}\n", task.priority.tag(), task.title));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!("Total open: {total}\n\n{CALL_TO_ACTION}\n"));
    out
}
