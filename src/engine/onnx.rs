//! ONNX Runtime engine running pretrained super-resolution graphs.

use std::path::Path;
use std::sync::Mutex;

use half::f16;
use half::slice::HalfFloatSliceExt;
use image::RgbImage;
use ndarray::Array4;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use tracing::{debug, info};

use crate::engine::{resample_to_scale, tiling, EngineSettings, InferenceEngine};
use crate::error::EngineError;
use crate::model::ModelConfig;

/// Engine backed by an `ort` session.
///
/// The session is the device context: it holds the graph and its weights in
/// device memory for the engine's lifetime, and is released when the engine
/// is dropped. Forward passes take the session mutex, so at most one pass
/// touches the device at a time.
pub struct OrtEngine {
    session: Mutex<Session>,
    model_id: String,
    native_scale: u32,
    input_name: String,
    output_name: String,
    is_fp16: bool,
    tile_size: usize,
    tile_overlap: usize,
}

impl OrtEngine {
    /// Build a session from a weight file and wrap it as an engine.
    ///
    /// Registers the CUDA execution provider with CPU fallback. The
    /// network's precision is detected from its input dtype; FP16 graphs
    /// are fed `f16` tensors directly.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionBuild`] if the graph cannot be loaded
    /// or the execution providers cannot be registered.
    pub fn load(
        config: &ModelConfig,
        weight_path: &Path,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(4))
            .and_then(|b| {
                b.with_execution_providers([
                    CUDAExecutionProvider::default().build(),
                    CPUExecutionProvider::default().build(),
                ])
            })
            .and_then(|b| b.commit_from_file(weight_path))
            .map_err(|e| EngineError::SessionBuild(e.to_string()))?;

        let input_name = session.inputs[0].name.clone();
        let output_name = session.outputs[0].name.clone();
        let is_fp16 = match &session.inputs[0].input_type {
            ort::value::ValueType::Tensor { ty, .. } => {
                *ty == ort::tensor::TensorElementType::Float16
            }
            _ => false,
        };

        info!(
            model = %config.id,
            arch = config.arch.name(),
            scale = config.native_scale,
            fp16 = is_fp16,
            path = %weight_path.display(),
            "Loaded inference session"
        );

        Ok(Self {
            session: Mutex::new(session),
            model_id: config.id.clone(),
            native_scale: config.native_scale,
            input_name,
            output_name,
            is_fp16,
            tile_size: settings.tile_size,
            tile_overlap: settings.tile_overlap,
        })
    }

    /// One forward pass over a single NCHW tile.
    fn forward(&self, tile: &Array4<f32>) -> Result<Array4<f32>, EngineError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| EngineError::Inference("session lock poisoned".to_string()))?;

        let output = if self.is_fp16 {
            run_fp16(&mut session, tile, &self.input_name, &self.output_name)?
        } else {
            run_fp32(&mut session, tile, &self.input_name, &self.output_name)?
        };

        output
            .into_dimensionality::<ndarray::Ix4>()
            .map_err(|e| EngineError::Inference(e.to_string()))
    }
}

impl InferenceEngine for OrtEngine {
    fn enhance(&self, image: &RgbImage, outscale: f32) -> Result<RgbImage, EngineError> {
        let (w, h) = image.dimensions();
        debug!(
            model = %self.model_id,
            width = w,
            height = h,
            outscale,
            "Running inference"
        );

        let input = tiling::image_to_nchw(image);
        let output = tiling::enhance_nchw(
            &input,
            self.native_scale as usize,
            self.tile_size,
            self.tile_overlap,
            |tile| self.forward(tile),
        )?;
        let native = tiling::nchw_to_image(&output)?;

        if outscale == self.native_scale as f32 {
            return Ok(native);
        }
        Ok(resample_to_scale(&native, w, h, outscale))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn native_scale(&self) -> u32 {
        self.native_scale
    }
}

fn run_fp32(
    session: &mut Session,
    input: &Array4<f32>,
    input_name: &str,
    output_name: &str,
) -> Result<ndarray::ArrayD<f32>, EngineError> {
    let input_tensor =
        Tensor::from_array(input.clone()).map_err(|e| EngineError::Inference(e.to_string()))?;
    let outputs = session
        .run(ort::inputs![input_name => &input_tensor])
        .map_err(|e| EngineError::Inference(e.to_string()))?;
    let view = outputs[output_name]
        .try_extract_array::<f32>()
        .map_err(|e| EngineError::Inference(e.to_string()))?;
    Ok(view.to_owned())
}

fn run_fp16(
    session: &mut Session,
    input: &Array4<f32>,
    input_name: &str,
    output_name: &str,
) -> Result<ndarray::ArrayD<f32>, EngineError> {
    let contiguous;
    let f32_slice = match input.as_slice() {
        Some(s) => s,
        None => {
            contiguous = input.as_standard_layout().into_owned();
            contiguous
                .as_slice()
                .ok_or_else(|| EngineError::Inference("non-contiguous input tensor".to_string()))?
        }
    };
    let mut fp16_data = vec![f16::ZERO; f32_slice.len()];
    fp16_data.convert_from_f32_slice(f32_slice);

    let fp16_array = ndarray::ArrayD::from_shape_vec(input.shape().to_vec(), fp16_data)
        .map_err(|e| EngineError::Inference(e.to_string()))?;
    let input_tensor =
        Tensor::from_array(fp16_array).map_err(|e| EngineError::Inference(e.to_string()))?;
    let outputs = session
        .run(ort::inputs![input_name => &input_tensor])
        .map_err(|e| EngineError::Inference(e.to_string()))?;
    let view = outputs[output_name]
        .try_extract_array::<f16>()
        .map_err(|e| EngineError::Inference(e.to_string()))?;

    let fp16_owned;
    let fp16_slice = match view.as_slice() {
        Some(s) => s,
        None => {
            fp16_owned = view.as_standard_layout().into_owned();
            fp16_owned
                .as_slice()
                .ok_or_else(|| EngineError::Inference("non-contiguous output tensor".to_string()))?
        }
    };
    let mut f32_data = vec![0.0f32; fp16_slice.len()];
    fp16_slice.convert_to_f32_slice(&mut f32_data);

    ndarray::ArrayD::from_shape_vec(view.shape().to_vec(), f32_data)
        .map_err(|e| EngineError::Inference(e.to_string()))
}
