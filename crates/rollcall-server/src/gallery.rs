//! Builds the reference [`Gallery`] from a directory of face images.
//!
//! Each image is named after the person it shows (`Anna Ivanova.jpg`) and is
//! embedded once at startup. Images that cannot be read or embedded are
//! skipped with a warning, and an unreadable directory yields an empty
//! gallery.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bytes::Bytes;
use rollcall_core::{
  matching::Gallery,
  record::PersonId,
  station::{FaceEmbedder, Frame},
};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// `true` for `.jpg`, `.jpeg` and `.png`, in any case.
pub fn is_reference_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

fn content_type(path: &Path) -> &'static str {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some(ext) if ext.eq_ignore_ascii_case("png") => "image/png",
    _ => "image/jpeg",
  }
}

/// Reference images in `dir`, sorted by file name.
pub async fn reference_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
  let mut entries = tokio::fs::read_dir(dir)
    .await
    .with_context(|| format!("failed to list reference directory {dir:?}"))?;

  let mut paths = vec![];
  while let Some(entry) = entries.next_entry().await? {
    let path = entry.path();
    if is_reference_image(&path) && entry.file_type().await?.is_file() {
      paths.push(path);
    }
  }
  paths.sort();
  Ok(paths)
}

/// Embed every reference image in `dir`.
pub async fn load_gallery<E: FaceEmbedder>(dir: &Path, embedder: &E) -> Gallery {
  let mut gallery = Gallery::new();

  let paths = match reference_images(dir).await {
    Ok(paths) => paths,
    Err(e) => {
      tracing::warn!(error = ?e, "could not list reference images");
      vec![]
    }
  };

  for path in paths {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let person_id = match PersonId::from_reference_name(&name) {
      Ok(id) => id,
      Err(e) => {
        tracing::warn!(file = %name, error = %e, "skipping reference image");
        continue;
      }
    };

    let bytes = match tokio::fs::read(&path).await {
      Ok(bytes) => Bytes::from(bytes),
      Err(e) => {
        tracing::warn!(file = %name, error = %e, "failed to read reference image");
        continue;
      }
    };
    let frame = Frame { bytes, content_type: content_type(&path).to_owned() };

    match embedder.embed(&frame).await {
      Ok(Some(embedding)) => {
        if let Err(e) = gallery.insert(person_id.clone(), embedding) {
          tracing::warn!(person = %person_id, error = %e, "rejected reference embedding");
          continue;
        }
        tracing::debug!(person = %person_id, "loaded reference face");
      }
      Ok(None) => tracing::warn!(file = %name, "no face found in reference image"),
      Err(e) => tracing::warn!(file = %name, error = %e, "failed to embed reference image"),
    }
  }

  if gallery.is_empty() {
    tracing::warn!(dir = ?dir, "reference gallery is empty; every face will be rejected");
  } else {
    tracing::info!(count = gallery.len(), dimension = ?gallery.dimension(), "loaded reference gallery");
  }
  gallery
}
