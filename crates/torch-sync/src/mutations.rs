//! The mutation façade.
//!
//! Every operation is one store write. Nothing here touches the snapshot:
//! a successful write shows up when the feed delivers the next snapshot,
//! and a rejected one is returned to the caller with nothing to roll back.

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};
use torch_core::{
  catalog::{GradeInput, SettingsPatch, SubjectInput},
  resource::{PaperMeta, ResourceDetails, ResourceType, wire},
  store::{ChangeFeedStore, Fields, MergePolicy, NewDocument, collections},
};

use crate::{Error, Result};

pub struct Mutations<S> {
  store:             Arc<S>,
  settings_document: String,
}

impl<S> Clone for Mutations<S> {
  fn clone(&self) -> Self {
    Self {
      store:             self.store.clone(),
      settings_document: self.settings_document.clone(),
    }
  }
}

/// Where a new resource is filed.
fn placement(
  grade: &str,
  subject: &str,
  language: &str,
  resource_type: ResourceType,
) -> Result<Fields> {
  for (name, value) in [("grade", grade), ("subject", subject), ("language", language)] {
    if value.trim().is_empty() {
      return Err(Error::Invalid(format!("{name} must not be empty")));
    }
  }
  let mut fields = Fields::new();
  fields.insert(wire::GRADE.into(), Value::String(grade.to_owned()));
  fields.insert(wire::SUBJECT.into(), Value::String(subject.to_owned()));
  fields.insert(wire::RESOURCE_TYPE.into(), resource_type.as_str().into());
  fields.insert(wire::LANGUAGES.into(), Value::Array(vec![language.into()]));
  Ok(fields)
}

fn require_id(kind: &str, id: &str) -> Result<()> {
  if id.trim().is_empty() {
    return Err(Error::Invalid(format!("{kind} id must not be empty")));
  }
  Ok(())
}

impl<S: ChangeFeedStore> Mutations<S> {
  pub fn new(store: Arc<S>, settings_document: String) -> Self {
    Self { store, settings_document }
  }

  // ─── Resources ─────────────────────────────────────────────────────────────

  pub async fn add_textbook(
    &self,
    grade: &str,
    subject: &str,
    language: &str,
    details: ResourceDetails,
  ) -> Result<String> {
    let fields = placement(grade, subject, language, ResourceType::Textbook)?;
    self.add_resource(fields, details).await
  }

  pub async fn add_paper(
    &self,
    grade: &str,
    subject: &str,
    language: &str,
    paper: PaperMeta,
    details: ResourceDetails,
  ) -> Result<String> {
    if paper.category.trim().is_empty() {
      return Err(Error::Invalid("paper category must not be empty".into()));
    }
    let mut fields = placement(grade, subject, language, ResourceType::Papers)?;
    fields.insert(wire::PAPER_TYPE.into(), paper.paper_type.as_str().into());
    fields.insert(wire::PAPER_CATEGORY.into(), Value::String(paper.category));
    fields.insert(wire::SCHOOL.into(), Value::String(paper.school.unwrap_or_default()));
    self.add_resource(fields, details).await
  }

  pub async fn add_video(
    &self,
    grade: &str,
    subject: &str,
    language: &str,
    details: ResourceDetails,
  ) -> Result<String> {
    let fields = placement(grade, subject, language, ResourceType::Videos)?;
    self.add_resource(fields, details).await
  }

  pub async fn add_note(
    &self,
    grade: &str,
    subject: &str,
    language: &str,
    details: ResourceDetails,
  ) -> Result<String> {
    let fields = placement(grade, subject, language, ResourceType::Notes)?;
    self.add_resource(fields, details).await
  }

  /// Details first, so placement always wins over a caller-supplied field of
  /// the same name.
  async fn add_resource(&self, placement: Fields, details: ResourceDetails) -> Result<String> {
    let mut fields = details.into_fields();
    fields.extend(placement);

    let doc = NewDocument::stamped(fields, wire::UPLOAD_DATE);
    match self.store.add(collections::RESOURCES, doc).await {
      Ok(id) => {
        info!(%id, "resource added");
        Ok(id)
      }
      Err(e) => {
        error!(error = %e, "failed to add resource");
        Err(Error::store(e))
      }
    }
  }

  pub async fn delete_resource(&self, id: &str) -> Result<()> {
    require_id("resource", id)?;
    self.delete(collections::RESOURCES, id).await
  }

  // ─── Grades and subjects ───────────────────────────────────────────────────

  pub async fn add_grade(&self, id: &str, grade: GradeInput) -> Result<()> {
    require_id("grade", id)?;
    self.set(collections::GRADES, id, grade.into_fields(id)).await
  }

  pub async fn delete_grade(&self, id: &str) -> Result<()> {
    require_id("grade", id)?;
    self.delete(collections::GRADES, id).await
  }

  pub async fn add_subject(&self, id: &str, subject: SubjectInput) -> Result<()> {
    require_id("subject", id)?;
    self.set(collections::SUBJECTS, id, subject.into_fields(id)).await
  }

  /// Merge `fields` into an existing subject; unnamed fields are kept.
  pub async fn update_subject(&self, id: &str, mut fields: Fields) -> Result<()> {
    require_id("subject", id)?;
    fields.insert(wire::ID.into(), Value::String(id.to_owned()));
    self.merge(collections::SUBJECTS, id, fields).await
  }

  pub async fn delete_subject(&self, id: &str) -> Result<()> {
    require_id("subject", id)?;
    self.delete(collections::SUBJECTS, id).await
  }

  // ─── Settings ──────────────────────────────────────────────────────────────

  /// Overwrite the named settings fields, leaving the others as stored.
  pub async fn update_settings(&self, patch: SettingsPatch) -> Result<()> {
    if patch.is_empty() {
      return Ok(());
    }
    let document = self.settings_document.clone();
    self.merge(collections::SETTINGS, &document, patch.into_fields()).await
  }

  // ─── Store calls ───────────────────────────────────────────────────────────

  async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
    self.store.set(collection, id, fields).await.map_err(|e| {
      error!(collection, id, error = %e, "write rejected");
      Error::store(e)
    })?;
    info!(collection, id, "document written");
    Ok(())
  }

  async fn merge(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
    self
      .store
      .create_or_merge(collection, id, fields, MergePolicy::PreferIncoming)
      .await
      .map_err(|e| {
        error!(collection, id, error = %e, "merge rejected");
        Error::store(e)
      })?;
    info!(collection, id, "document merged");
    Ok(())
  }

  async fn delete(&self, collection: &str, id: &str) -> Result<()> {
    self.store.delete(collection, id).await.map_err(|e| {
      error!(collection, id, error = %e, "delete rejected");
      Error::store(e)
    })?;
    info!(collection, id, "document deleted");
    Ok(())
  }
}
