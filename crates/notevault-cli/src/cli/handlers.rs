//! One handler per subcommand. Each returns the text to print, so handlers
//! are tested against an in-memory vault without touching stdout.

use anyhow::{bail, Context, Result};
use notevault::medium::StorageMedium;
use notevault::{Note, NoteVault};
use uuid::Uuid;

use super::render;

pub fn info<M: StorageMedium>(vault: &NoteVault<M>, json: bool) -> Result<String> {
    let info = vault.storage_info().context("reading storage info")?;
    if json {
        Ok(serde_json::to_string_pretty(&info)? + "\n")
    } else {
        Ok(render::render_info(&info))
    }
}

pub fn list<M: StorageMedium>(vault: &NoteVault<M>, json: bool) -> Result<String> {
    let notes = vault.load_notes().context("loading notes")?;
    if json {
        Ok(serde_json::to_string_pretty(&notes)? + "\n")
    } else {
        Ok(render::render_notes(&notes))
    }
}

pub fn add<M: StorageMedium>(
    vault: &NoteVault<M>,
    title: String,
    content: String,
    tags: Vec<String>,
    category: Option<String>,
) -> Result<String> {
    let mut note = Note::new(title, content).with_tags(tags);
    note.category = category;
    let id = note.id;
    vault.save_note(note).context("saving note")?;
    Ok(format!("Added {}\n", id))
}

pub fn delete<M: StorageMedium>(vault: &NoteVault<M>, id: &Uuid) -> Result<String> {
    let removed = vault.delete_note(id)?;
    Ok(format!("Deleted \"{}\" ({})\n", removed.title, removed.id))
}

pub fn backups<M: StorageMedium>(vault: &NoteVault<M>) -> Result<String> {
    Ok(render::render_backups(&vault.list_backups()?))
}

pub fn restore<M: StorageMedium>(vault: &NoteVault<M>) -> Result<String> {
    match vault.restore_latest().context("restoring backup")? {
        Some(notes) => Ok(format!("Restored {} notes from the newest valid backup\n", notes.len())),
        None => bail!("no valid backup to restore from"),
    }
}

pub fn prune<M: StorageMedium>(vault: &NoteVault<M>, keep: Option<usize>) -> Result<String> {
    let keep = keep.unwrap_or(vault.config().max_backups);
    let removed = vault.prune_backups(keep)?;
    Ok(format!("Pruned {} backups, {} kept at most\n", removed, keep))
}

pub fn clear<M: StorageMedium>(vault: &NoteVault<M>, yes: bool) -> Result<String> {
    if !yes {
        bail!("refusing to clear without --yes");
    }
    vault.clear_all()?;
    Ok("Cleared all notes and backups\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notevault::MemMedium;

    fn vault() -> NoteVault<MemMedium> {
        NoteVault::with_medium(MemMedium::new())
    }

    #[test]
    fn test_add_then_list() {
        let v = vault();
        let out = add(
            &v,
            "Groceries".into(),
            "milk".into(),
            vec!["home".into()],
            Some("errands".into()),
        )
        .unwrap();
        assert!(out.starts_with("Added "));

        let notes = v.load_notes().unwrap();
        assert_eq!(notes[0].category.as_deref(), Some("errands"));
        assert!(list(&v, false).unwrap().contains("Groceries"));

        let json: serde_json::Value = serde_json::from_str(&list(&v, true).unwrap()).unwrap();
        assert_eq!(json[0]["title"], "Groceries");
        assert_eq!(json[0]["tags"][0], "home");
    }

    #[test]
    fn test_add_invalid_note_fails() {
        let v = vault();
        let err = add(&v, "  ".into(), String::new(), vec![], None).unwrap_err();
        assert!(format!("{:#}", err).contains("saving note"));
    }

    #[test]
    fn test_delete() {
        let v = vault();
        let note = Note::new("Temp", "");
        v.save_note(note.clone()).unwrap();
        assert!(delete(&v, &note.id).unwrap().contains("Temp"));
        assert!(delete(&v, &note.id).is_err());
    }

    #[test]
    fn test_info_json() {
        let v = vault();
        v.save_note(Note::new("A", "")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&info(&v, true).unwrap()).unwrap();
        assert_eq!(json["notesCount"], 1);
        assert_eq!(json["quota"], serde_json::Value::Null);
        assert_eq!(json["usagePercentage"], serde_json::Value::Null);
        assert!(json.get("notes_count").is_none());
    }

    #[test]
    fn test_restore_and_prune() {
        let v = vault();
        assert!(restore(&v).is_err());
        for i in 0..4 {
            v.save_notes(vec![Note::new(format!("n{}", i), "")]).unwrap();
        }
        assert!(restore(&v).unwrap().contains("Restored 1 notes"));
        assert_eq!(v.load_notes().unwrap()[0].title, "n2");

        assert!(prune(&v, Some(1)).unwrap().starts_with("Pruned 2"));
        assert!(backups(&v).unwrap().lines().count() == 1);
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let v = vault();
        v.save_note(Note::new("A", "")).unwrap();
        assert!(clear(&v, false).is_err());
        assert_eq!(v.load_notes().unwrap().len(), 1);
        clear(&v, true).unwrap();
        assert!(v.load_notes().unwrap().is_empty());
    }
}
