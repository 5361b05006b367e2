//! The state of one template being authored.

use ecow::EcoString;

use crate::block::Block;
use crate::editor::{Edit, EditResult};
use crate::sanitize::ValidationError;
use crate::template::{Template, TemplateDraft};

/// Whether a session creates a new template or edits a stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    /// The draft becomes a new template.
    Create,
    /// The draft replaces the template with this id.
    Edit(EcoString),
}

/// What a session hands to the server on submit.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// `POST /plantillas`
    Create(TemplateDraft),
    /// `PATCH /plantillas/{id}`
    Update {
        /// The template id.
        id: EcoString,
        /// The sanitized draft.
        draft: TemplateDraft,
    },
}

/// Owns the draft of a template while it is authored.
///
/// Edits replace the block list wholesale, so earlier snapshots handed out by
/// [`EditSession::blocks`] stay valid.
#[derive(Debug, Clone)]
pub struct EditSession {
    mode: SessionMode,
    draft: TemplateDraft,
    revision: u64,
    saved_revision: u64,
}

impl EditSession {
    /// Starts authoring a new template.
    pub fn create(draft: TemplateDraft) -> Self {
        Self {
            mode: SessionMode::Create,
            draft,
            revision: 0,
            saved_revision: 0,
        }
    }

    /// Starts editing a stored template.
    pub fn edit(template: &Template) -> Self {
        Self {
            mode: SessionMode::Edit(template.id.clone()),
            draft: template.draft.clone(),
            revision: 0,
            saved_revision: 0,
        }
    }

    /// The mode of the session.
    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    /// The current draft.
    pub fn draft(&self) -> &TemplateDraft {
        &self.draft
    }

    /// The current top-level blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.draft.structure.blocks
    }

    /// Changes the settings of the draft.
    pub fn update(&mut self, f: impl FnOnce(&mut TemplateDraft)) {
        f(&mut self.draft);
        self.revision += 1;
    }

    /// Applies a structural edit. A rejected edit leaves the draft unchanged.
    pub fn apply(&mut self, edit: &Edit) -> EditResult<()> {
        let blocks = edit.apply(&self.draft.structure.blocks)?;
        log::debug!("applied {edit:?}");
        self.draft.structure.blocks = blocks;
        self.revision += 1;
        Ok(())
    }

    /// Whether the draft changed since it was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.revision != self.saved_revision
    }

    /// The sanitized request for the current draft.
    pub fn submission(&self) -> Result<Submission, ValidationError> {
        let draft = self.draft.sanitized()?;
        Ok(match &self.mode {
            SessionMode::Create => Submission::Create(draft),
            SessionMode::Edit(id) => Submission::Update {
                id: id.clone(),
                draft,
            },
        })
    }

    /// Records that the server accepted the draft. A created template turns
    /// the session into an edit session for it.
    pub fn mark_saved(&mut self, saved: &Template) {
        self.mode = SessionMode::Edit(saved.id.clone());
        self.draft = saved.draft.clone();
        self.saved_revision = self.revision;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::block::{BlockKind, Section};
    use crate::editor::EditError;
    use crate::path::BlockPath;

    #[test]
    fn create_then_submit() {
        let mut session = EditSession::create(TemplateDraft::new("Informe"));
        assert!(!session.is_dirty());
        assert_eq!(session.submission(), Err(ValidationError::EmptyStructure));

        session.apply(&Edit::AddBlock(BlockKind::Chapter)).unwrap();
        session
            .apply(&Edit::AddChild {
                parent: BlockPath::root(0),
                kind: BlockKind::Paragraph,
            })
            .unwrap();
        assert!(session.is_dirty());

        let Submission::Create(draft) = session.submission().unwrap() else {
            panic!("a new session submits a creation");
        };
        assert_eq!(
            serde_json::to_value(&draft.structure.blocks).unwrap(),
            json!([{
                "tipo": "capitulo",
                "titulo": "capitulo 1",
                "bloques": [{ "tipo": "parrafo", "texto_html": "(párrafo 1)", "texto_plano": "(párrafo 1)" }]
            }])
        );
        // the draft itself keeps what the user typed
        assert_eq!(
            session.blocks()[0],
            Block::Chapter(Section {
                title: "".into(),
                blocks: vec![BlockKind::Paragraph.create()],
            })
        );
    }

    #[test]
    fn rejected_edits_do_not_count() {
        let mut session = EditSession::create(TemplateDraft::default());
        let err = session.apply(&Edit::RemoveBlock(BlockPath::root(0)));
        assert_eq!(err, Err(EditError::IndexOutOfRange { index: 0, len: 0 }));
        assert!(!session.is_dirty());
    }

    #[test]
    fn saving_switches_to_edit_mode() {
        let mut session = EditSession::create(TemplateDraft::new("Acta"));
        session.apply(&Edit::AddBlock(BlockKind::Placeholder)).unwrap();
        session.update(|draft| draft.font = "Calibri".into());

        let saved: Template = serde_json::from_value(json!({
            "id": "t9",
            "nombre": "Acta",
            "fuente": "Calibri",
            "estructura": { "tipo": "documento", "bloques": [{ "tipo": "placeholder", "clave": "placeholder_1" }] }
        }))
        .unwrap();
        session.mark_saved(&saved);

        assert!(!session.is_dirty());
        assert_eq!(session.mode(), &SessionMode::Edit("t9".into()));
        assert!(matches!(
            session.submission().unwrap(),
            Submission::Update { id, .. } if id == "t9"
        ));
    }
}
