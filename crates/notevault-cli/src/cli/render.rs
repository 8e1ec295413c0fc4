//! Plain-text rendering. Handlers build strings here and print them once.

use chrono::{DateTime, Utc};
use notevault::model::Note;
use notevault::store::{BackupSummary, StorageInfo};

const TITLE_WIDTH: usize = 40;

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    timeago::Formatter::new().convert(duration.to_std().unwrap_or_default())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", cut)
}

pub fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No notes.\n".to_string();
    }
    let mut out = String::new();
    for note in notes {
        let mut flags = String::new();
        if note.is_pinned {
            flags.push('*');
        }
        if note.is_archived {
            flags.push('a');
        }
        let tags = if note.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", note.tags.join(", "))
        };
        out.push_str(&format!(
            "{}  {:<2} {:<width$}{}  {}\n",
            note.id,
            flags,
            truncate(&note.title, TITLE_WIDTH),
            tags,
            format_time_ago(note.updated_at),
            width = TITLE_WIDTH
        ));
    }
    out
}

pub fn render_info(info: &StorageInfo) -> String {
    let mut out = format!(
        "notes:    {}\ndata:     {}{}\nbackups:  {} ({})\ntotal:    {}\n",
        info.notes_count,
        format_bytes(info.data_size as u64),
        if info.compressed { " (compressed)" } else { "" },
        info.backup_count,
        format_bytes(info.backup_size as u64),
        format_bytes(info.total_size as u64),
    );
    match (info.quota, info.usage_percentage) {
        (Some(q), Some(pct)) => out.push_str(&format!(
            "quota:    {} of {} ({:.1}%)\n",
            format_bytes(q.usage),
            format_bytes(q.limit),
            pct
        )),
        _ => out.push_str("quota:    unlimited\n"),
    }
    out
}

pub fn render_backups(backups: &[BackupSummary]) -> String {
    if backups.is_empty() {
        return "No backups.\n".to_string();
    }
    backups
        .iter()
        .map(|b| {
            format!(
                "{}  v{}  {:>10}{}  {}\n",
                b.key,
                b.version,
                format_bytes(b.size as u64),
                if b.compressed { "  gz/lz" } else { "" },
                format_time_ago(b.created_at)
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notevault::medium::QuotaEstimate;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("much longer title", 8), "much lo…");
    }

    #[test]
    fn test_render_notes() {
        assert_eq!(render_notes(&[]), "No notes.\n");

        let mut note = Note::new("Groceries", "").with_tags(["home"]);
        note.is_pinned = true;
        let out = render_notes(&[note.clone()]);
        assert!(out.starts_with(&note.id.to_string()));
        assert!(out.contains("*"));
        assert!(out.contains("Groceries"));
        assert!(out.contains("[home]"));
        assert!(out.contains("ago") || out.contains("now"));
    }

    #[test]
    fn test_render_info() {
        let info = StorageInfo {
            notes_count: 3,
            data_size: 2048,
            backup_count: 2,
            backup_size: 100,
            total_size: 2148,
            compressed: true,
            quota: Some(QuotaEstimate {
                usage: 2148,
                limit: 10_000,
            }),
            usage_percentage: Some(21.48),
        };
        let out = render_info(&info);
        assert!(out.contains("notes:    3"));
        assert!(out.contains("2.0 KiB (compressed)"));
        assert!(out.contains("backups:  2 (100 B)"));
        assert!(out.contains("(21.5%)"));

        let unlimited = StorageInfo {
            quota: None,
            usage_percentage: None,
            ..info
        };
        assert!(render_info(&unlimited).contains("unlimited"));
    }

    #[test]
    fn test_render_backups() {
        assert_eq!(render_backups(&[]), "No backups.\n");
        let out = render_backups(&[BackupSummary {
            key: "notes_backup_1_abcd1234".to_string(),
            created_at: Utc::now(),
            version: "2.0".to_string(),
            compressed: false,
            size: 512,
        }]);
        assert!(out.starts_with("notes_backup_1_abcd1234  v2.0"));
        assert!(out.contains("512 B"));
    }
}
