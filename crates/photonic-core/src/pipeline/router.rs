use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::align::{
    detect_alignment_type, Aligner, AlignmentRequest, AlignmentResult, AlignmentType, HuginAligner,
    PhaseCorrelationAligner, StarAligner,
};
use crate::cancel::CancelToken;
use crate::config::PhotonicConfig;
use crate::error::{PhotonicError, Result};
use crate::io::{is_raw_file, list_images};
use crate::raw::RawConversionService;
use crate::selection::{select_best, Processor, Registry, Selection};
use crate::stack::{EnfuseStacker, NativeStacker, StackMethod, StackRequest, Stacker};

use super::engine::JobProcessor;
use super::job::{
    AlignOptions, Job, JobKind, JobResult, Meta, PanoramicOptions, RawConvertOptions, StackOptions,
    TimelapseOptions,
};
use super::panoramic::stitch_panorama;
use super::scan::scan;
use super::timelapse::encode_timelapse;

/// Images ready for processing after RAW pre-conversion.
#[derive(Clone, Debug, Default)]
struct Prepared {
    images: Vec<PathBuf>,
    /// RAW cache used, if any.
    cache_dir: Option<PathBuf>,
    warnings: Vec<String>,
}

/// Dispatches each job to its handler. Owns every processor registry.
pub struct Router {
    config: PhotonicConfig,
    aligners: Registry<dyn Aligner>,
    stackers: Registry<dyn Stacker>,
    raw: RawConversionService,
}

impl Router {
    /// Build the registries from configuration.
    pub fn new(config: PhotonicConfig) -> Result<Self> {
        let mut aligners: Registry<dyn Aligner> = Registry::new();
        aligners.register(Arc::new(StarAligner::new(config.alignment.astro_enabled)))?;
        aligners.register(Arc::new(HuginAligner::new(config.alignment.hugin_enabled)))?;
        aligners.register(Arc::new(PhaseCorrelationAligner::new(
            config.alignment.phase_correlation_enabled,
        )))?;

        let mut stackers: Registry<dyn Stacker> = Registry::new();
        stackers.register(Arc::new(NativeStacker))?;
        stackers.register(Arc::new(EnfuseStacker::new(true)))?;

        let raw = RawConversionService::new(config.raw.clone())?;
        Ok(Self::with_parts(config, aligners, stackers, raw))
    }

    /// Assemble a router from prebuilt registries.
    pub fn with_parts(
        config: PhotonicConfig,
        aligners: Registry<dyn Aligner>,
        stackers: Registry<dyn Stacker>,
        raw: RawConversionService,
    ) -> Self {
        Self {
            config,
            aligners,
            stackers,
            raw,
        }
    }

    pub fn config(&self) -> &PhotonicConfig {
        &self.config
    }

    pub fn aligners(&self) -> &Registry<dyn Aligner> {
        &self.aligners
    }

    pub fn stackers(&self) -> &Registry<dyn Stacker> {
        &self.stackers
    }

    pub fn raw(&self) -> &RawConversionService {
        &self.raw
    }

    /// Pick an aligner for `images` and run it into `output_dir`.
    pub fn align_images(
        &self,
        cancel: &CancelToken,
        images: &[PathBuf],
        output_dir: &Path,
        options: &AlignOptions,
    ) -> Result<AlignmentResult> {
        let alignment_type = options
            .alignment_type
            .unwrap_or_else(|| detect_alignment_type(images));
        let mut star = self.config.alignment.star.clone();
        if let Some(sensitivity) = options.star_sensitivity {
            star.sensitivity = sensitivity;
        }

        let selection = Selection {
            kind: "alignment",
            task: alignment_type.to_string(),
            explicit: options.processor.as_deref(),
            default: self.config.alignment.default_processor.as_deref(),
            inputs: images,
        };
        let aligner = select_best(&self.aligners, &selection, |a| a.supports(alignment_type))?;

        info!(
            aligner = aligner.name(),
            alignment_type = %alignment_type,
            images = images.len(),
            output = %output_dir.display(),
            "aligning images"
        );
        let request = AlignmentRequest {
            images: images.to_vec(),
            alignment_type,
            output_dir: output_dir.to_path_buf(),
            quality: options.quality.clone(),
            star,
        };
        aligner.align(cancel, &request)
    }

    /// Convert RAW files under `input`, then list every usable image.
    fn prepare(
        &self,
        cancel: &CancelToken,
        input: &Path,
        raw_tool: Option<&str>,
        ignore_cache: bool,
    ) -> Result<Prepared> {
        let mut prepared = Prepared::default();
        if let Some(report) = self.raw.preprocess_directory(cancel, input, raw_tool, ignore_cache)? {
            prepared.images.extend(list_images(&report.dir)?);
            prepared.warnings.extend(report.failures);
            prepared.cache_dir = Some(report.dir);
        }
        prepared
            .images
            .extend(list_images(input)?.into_iter().filter(|p| !is_raw_file(p)));
        prepared.images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if prepared.images.is_empty() {
            return Err(PhotonicError::EmptySequence);
        }
        Ok(prepared)
    }

    fn release_cache(&self, prepared: &Prepared, preserve: bool) {
        match (&prepared.cache_dir, preserve) {
            (Some(dir), false) => {
                info!(cache = %dir.display(), "removing RAW conversion cache");
                if let Err(e) = fs::remove_dir_all(dir) {
                    warn!(cache = %dir.display(), error = %e, "could not remove RAW cache");
                }
            }
            (Some(dir), true) => debug!(cache = %dir.display(), "keeping RAW conversion cache"),
            _ => {}
        }
    }

    fn handle_scan(&self, job: &Job) -> Result<Meta> {
        let summary = scan(&job.input)?;
        info!(images = summary.images.len(), groups = summary.groups.len(), "scan complete");

        let mut meta = Meta::new();
        meta.insert("images".into(), json!(summary.images.len()));
        meta.insert("groups".into(), to_value(&summary.groups));
        Ok(meta)
    }

    fn handle_raw_convert(&self, cancel: &CancelToken, job: &Job, options: &RawConvertOptions) -> Result<Meta> {
        let mut meta = Meta::new();

        if job.input.is_file() {
            if !is_raw_file(&job.input) {
                return Err(PhotonicError::InvalidOption {
                    key: "input".into(),
                    reason: format!("{} is not a RAW file", job.input.display()),
                });
            }
            let result = self
                .raw
                .convert_with_fallback(cancel, &job.input, &job.output, options.tool.as_deref())?;
            meta.insert("tool".into(), json!(result.tool));
            meta.insert("output".into(), json!(result.output));
            meta.insert("converted".into(), json!(1));
            meta.insert("cached".into(), json!(0));
            return Ok(meta);
        }

        match self
            .raw
            .preprocess_directory(cancel, &job.input, options.tool.as_deref(), options.ignore_cache)?
        {
            Some(report) => {
                meta.insert("output".into(), json!(report.dir));
                meta.insert("converted".into(), json!(report.converted));
                meta.insert("cached".into(), json!(report.cached));
                meta.insert("failures".into(), json!(report.failures));
            }
            None => {
                meta.insert("converted".into(), json!(0));
                meta.insert("cached".into(), json!(0));
            }
        }
        Ok(meta)
    }

    fn handle_stack(&self, cancel: &CancelToken, job: &Job, options: &StackOptions) -> Result<Meta> {
        let mut options = options.clone();
        self.config.stacking.fill(&mut options);

        let prepared = self.prepare(cancel, &job.input, options.raw_tool.as_deref(), options.ignore_cache)?;
        let mut warnings = prepared.warnings.clone();
        let mut images = prepared.images.clone();

        if let Some(alignment_type) = options.alignment {
            let input_name = job
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input".to_string());
            let aligned_dir = job
                .output
                .parent()
                .unwrap_or(Path::new("."))
                .join("aligned")
                .join(input_name);
            let align_options = AlignOptions {
                alignment_type: Some(alignment_type),
                ..Default::default()
            };
            let aligned = self.align_images(cancel, &images, &aligned_dir, &align_options)?;
            warnings.extend(aligned.warnings);
            images = aligned.aligned_images;
        }

        let method = StackMethod::parse(&options.method, &options)?;
        if images.len() < 2 {
            return Err(PhotonicError::InsufficientImages {
                needed: 2,
                got: images.len(),
            });
        }
        // Astro mode keeps statistical methods on the in-process rejection stacker.
        let default = if options.astro_mode && method.is_statistical() {
            Some(NativeStacker::NAME)
        } else {
            self.config.stacking.default_stacker.as_deref()
        };
        let selection = Selection {
            kind: "stacking",
            task: method.name().to_string(),
            explicit: options.stacker.as_deref(),
            default,
            inputs: &images,
        };
        let stacker = select_best(&self.stackers, &selection, |s| s.supports(&method))?;

        info!(stacker = stacker.name(), method = %method, images = images.len(), "stacking");
        let request = StackRequest {
            images,
            output: job.output.clone(),
            method,
        };
        let result = stacker.stack(cancel, &request)?;
        warnings.extend(result.warnings);

        let mut meta = Meta::new();
        meta.insert("output".into(), json!(result.output));
        meta.insert("method".into(), json!(result.method));
        meta.insert("imageCount".into(), json!(result.image_count));
        meta.insert("rejectedPixels".into(), json!(result.rejected_pixels));
        meta.insert("processingTimeMs".into(), json!(result.processing_time.as_millis() as u64));
        meta.insert("tool".into(), json!(result.tool));
        meta.insert("astroMode".into(), json!(options.astro_mode));
        meta.insert("warnings".into(), json!(warnings));
        Ok(meta)
    }

    fn handle_align(&self, cancel: &CancelToken, job: &Job, options: &AlignOptions) -> Result<Meta> {
        let images = if options.images.is_empty() {
            self.prepare(cancel, &job.input, None, false)?.images
        } else {
            options.images.clone()
        };

        let result = self.align_images(cancel, &images, &job.output, options)?;

        let mut meta = Meta::new();
        meta.insert("tool".into(), json!(result.tool));
        meta.insert("success".into(), json!(result.success));
        meta.insert("warnings".into(), json!(result.warnings));
        meta.insert("starCount".into(), json!(result.star_count));
        meta.insert("matchCount".into(), json!(result.match_count));
        meta.insert("alignedImages".into(), json!(result.aligned_images));
        meta.insert("referenceImage".into(), json!(result.reference_image));
        meta.insert("transforms".into(), to_value(&result.transforms));
        meta.insert("processingTimeMs".into(), json!(result.processing_time.as_millis() as u64));
        Ok(meta)
    }

    fn handle_timelapse(&self, cancel: &CancelToken, job: &Job, options: &TimelapseOptions) -> Result<Meta> {
        let prepared = self.prepare(cancel, &job.input, options.raw_tool.as_deref(), options.ignore_cache)?;
        let mut warnings = prepared.warnings.clone();
        let mut frames = prepared.images.clone();

        let base_output = match &options.output_dir {
            Some(dir) => dir.join("timelapse"),
            None => job.output.with_extension(""),
        };

        let mut stabilized = false;
        if options.stabilize {
            let dir = base_output.parent().unwrap_or(Path::new(".")).join("stabilized");
            let align_options = AlignOptions {
                alignment_type: Some(AlignmentType::Timelapse),
                ..Default::default()
            };
            match self.align_images(cancel, &frames, &dir, &align_options) {
                Ok(aligned) => {
                    warnings.extend(aligned.warnings);
                    frames = aligned.aligned_images;
                    stabilized = true;
                }
                Err(PhotonicError::Cancelled) => return Err(PhotonicError::Cancelled),
                Err(e) => {
                    warn!(error = %e, "stabilisation failed, encoding unaligned frames");
                    warnings.push(format!("stabilisation skipped: {e}"));
                }
            }
        }

        let outcome = encode_timelapse(
            cancel,
            &frames,
            &base_output,
            &options.formats,
            options.fps,
            options.resolution.as_deref(),
        );
        self.release_cache(&prepared, options.preserve_cache);
        let outcome = outcome?;
        warnings.extend(outcome.warnings);

        let mut meta = Meta::new();
        meta.insert("outputFiles".into(), to_value(&outcome.outputs));
        meta.insert("frameCount".into(), json!(outcome.frame_count));
        meta.insert("formats".into(), json!(options.formats));
        meta.insert("fps".into(), json!(options.fps));
        meta.insert("stabilized".into(), json!(stabilized));
        meta.insert("warnings".into(), json!(warnings));
        Ok(meta)
    }

    fn handle_panoramic(&self, cancel: &CancelToken, job: &Job, options: &PanoramicOptions) -> Result<Meta> {
        let prepared = self.prepare(cancel, &job.input, options.raw_tool.as_deref(), options.ignore_cache)?;

        let outcome = stitch_panorama(cancel, &prepared.images, &job.output, options);
        self.release_cache(&prepared, options.preserve_cache);
        let outcome = outcome?;

        let mut warnings = prepared.warnings;
        warnings.extend(outcome.warnings);

        let mut meta = Meta::new();
        meta.insert("output".into(), json!(outcome.output));
        meta.insert("projection".into(), json!(options.projection));
        meta.insert("blending".into(), json!(options.blending));
        meta.insert("quality".into(), json!(options.quality));
        meta.insert("aggression".into(), json!(options.aggression));
        meta.insert("imageCount".into(), json!(outcome.image_count));
        meta.insert("controlPoints".into(), json!(outcome.control_points));
        meta.insert("toolUsed".into(), json!(outcome.tool_used));
        meta.insert("warnings".into(), json!(warnings));
        Ok(meta)
    }
}

impl JobProcessor for Router {
    fn process(&self, cancel: &CancelToken, job: &Job) -> JobResult {
        let outcome = cancel.check().and_then(|()| match &job.kind {
            JobKind::Scan => self.handle_scan(job),
            JobKind::RawConvert(o) => self.handle_raw_convert(cancel, job, o),
            JobKind::Stack(o) => self.handle_stack(cancel, job, o),
            JobKind::Align(o) => self.handle_align(cancel, job, o),
            JobKind::Timelapse(o) => self.handle_timelapse(cancel, job, o),
            JobKind::Panoramic(o) => self.handle_panoramic(cancel, job, o),
        });
        match outcome {
            Ok(meta) => JobResult::success(job.clone(), meta),
            Err(e) => JobResult::failure(job.clone(), e),
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
