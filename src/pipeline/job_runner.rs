// Phase 10: ジョブ単位: 指示ファイル読込 -> 逐次ページ処理 -> 出力PDF組立

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::config::instructions::{PageSpec, load_pages, resolve_path};
use crate::config::merged::RunConfig;
use crate::error::LayerError;
use crate::layers::compositor::{LayerCompositor, LayerDump};
use crate::layers::policy::EncoderPolicy;
use crate::layers::segmenter::Segmenter;
use crate::pdf::writer::{PageComposer, PdfComposer};
use crate::pipeline::page_processor::{emit_page, layer_stem, prepare_page, render_page};

/// Configuration for a single job (one instruction document).
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub instructions_path: PathBuf,
    pub output_path: PathBuf,
    pub run: RunConfig,
}

impl JobConfig {
    /// Output goes next to the instruction file with its extension replaced.
    pub fn for_instructions(instructions_path: PathBuf, run: RunConfig) -> Self {
        let output_path = instructions_path.with_extension("pdf");
        Self {
            instructions_path,
            output_path,
            run,
        }
    }
}

/// A page left out of the output, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedPage {
    pub page_id: String,
    pub reason: String,
}

/// Result of processing a single job.
#[derive(Debug)]
pub struct JobResult {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub pages_written: usize,
    pub skipped: Vec<SkippedPage>,
}

/// Per-document page accounting returned by [`compose_document`].
#[derive(Debug, Default)]
pub struct DocumentReport {
    pub pages_written: usize,
    pub skipped: Vec<SkippedPage>,
}

/// Run a single job: load instructions, compose every page, write the PDF.
///
/// Nothing is written when the document aborts.
pub fn run_job(config: &JobConfig) -> crate::error::Result<JobResult> {
    if config.output_path == config.instructions_path {
        return Err(LayerError::config(format!(
            "output would overwrite the instruction file {}",
            config.instructions_path.display()
        )));
    }

    let run = &config.run;
    let pages = load_pages(&config.instructions_path, (run.page_width, run.page_height))?;
    tracing::info!(
        pages = pages.len(),
        mode = ?run.mode,
        "{} -> {}",
        config.instructions_path.display(),
        config.output_path.display()
    );

    let layer_dir = match &run.layer_dir {
        Some(dir) => Some(job_layer_dir(dir, &config.instructions_path)?),
        None => None,
    };

    let mut composer = PdfComposer::new();
    let report = compose_document(&pages, run, layer_dir.as_deref(), &mut composer)?;
    if report.pages_written == 0 {
        return Err(LayerError::instructions(format!(
            "{}: no page could be produced",
            config.instructions_path.display()
        )));
    }

    composer.save(&config.output_path)?;

    Ok(JobResult {
        input_path: config.instructions_path.clone(),
        output_path: config.output_path.clone(),
        pages_written: report.pages_written,
        skipped: report.skipped,
    })
}

/// Each document gets its own working directory for intermediate layers.
///
/// A relative `base` is taken from the instruction file's directory. The
/// subdirectory is `<stem>-<key>`, where `key` is derived from the instruction
/// file's absolute path, so same-named documents from different directories
/// never share it.
fn job_layer_dir(base: &Path, instructions_path: &Path) -> crate::error::Result<PathBuf> {
    let instructions_dir = instructions_path.parent().unwrap_or_else(|| Path::new("."));
    let dir = resolve_path(instructions_dir, base).join(layer_dir_name(instructions_path));
    std::fs::create_dir_all(&dir).map_err(|e| {
        LayerError::io_failure(format!("cannot create layer directory {}: {e}", dir.display()))
    })?;
    Ok(dir)
}

/// `<stem>-<first 8 hex digits of SHA-256(absolute path)>`.
pub fn layer_dir_name(instructions_path: &Path) -> String {
    let stem = instructions_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let absolute =
        std::path::absolute(instructions_path).unwrap_or_else(|_| instructions_path.to_path_buf());
    let digest = Sha256::digest(absolute.as_os_str().as_encoded_bytes());
    format!("{stem}-{}", &hex::encode(digest)[..8])
}

/// Compose every page into `composer`, sequentially and in document order.
///
/// Pages whose instructions or geometry are invalid are skipped; any other
/// error aborts the whole document.
pub fn compose_document<C: PageComposer>(
    pages: &[PageSpec],
    run: &RunConfig,
    layer_dir: Option<&Path>,
    composer: &mut C,
) -> crate::error::Result<DocumentReport> {
    let segmenter = Segmenter::new(run.segmenter.clone());
    let policy = EncoderPolicy::new(run.policy.clone())?;
    let compositor = LayerCompositor::new(run, &segmenter, &policy);

    let mut report = DocumentReport::default();
    for (index, spec) in pages.iter().enumerate() {
        let prepared = match prepare_page(spec, run) {
            Ok(p) => p,
            Err(e) if e.is_page_recoverable() => {
                let e = e.in_page(&spec.id);
                tracing::warn!("skipping page: {e}");
                report.skipped.push(SkippedPage {
                    page_id: spec.id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e.in_page(&spec.id)),
        };

        let dump = layer_dir.map(|dir| LayerDump {
            dir: dir.to_path_buf(),
            stem: layer_stem(index, spec),
        });
        let rendered =
            render_page(prepared, &compositor, &policy, dump.as_ref()).map_err(|e| e.in_page(&spec.id))?;
        emit_page(&rendered, composer).map_err(|e| e.in_page(&spec.id))?;

        tracing::info!(
            layers = rendered.layers.len(),
            images = rendered.images.len(),
            "page '{}' done",
            rendered.id
        );
        report.pages_written += 1;
    }
    Ok(report)
}
