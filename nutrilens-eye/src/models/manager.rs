//! Model manager with single-flight loading and placeholder fallback

use crate::config::DetectionConfig;
use crate::error::VisionError;
use crate::labels::{ClassTable, FoodAllowList};
use crate::models::detector::{Detector, DetectorLoader};
use crate::models::placeholder::PlaceholderDetector;
use crate::models::yolo::OnnxLoader;
use crate::nutrition::{NameTranslations, NutritionTable};
use crate::tensor::InputTensor;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

/// Which detector a handle wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Produced by the configured loader
    Onnx,
    /// Seeded stand-in
    Placeholder,
}

struct HandleInner {
    detector: Arc<dyn Detector>,
    kind: ModelKind,
    warmed_up: bool,
    loaded_at: DateTime<Utc>,
}

/// Shared handle to a loaded detector.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<HandleInner>,
}

impl ModelHandle {
    fn new(detector: Arc<dyn Detector>, kind: ModelKind, warmed_up: bool) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                detector,
                kind,
                warmed_up,
                loaded_at: Utc::now(),
            }),
        }
    }

    pub fn detector(&self) -> &Arc<dyn Detector> {
        &self.inner.detector
    }

    pub fn kind(&self) -> ModelKind {
        self.inner.kind
    }

    pub fn is_placeholder(&self) -> bool {
        self.inner.kind == ModelKind::Placeholder
    }

    pub fn is_warmed_up(&self) -> bool {
        self.inner.warmed_up
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.inner.loaded_at
    }

    pub fn input_size(&self) -> usize {
        self.inner.detector.input_size()
    }

    /// True when both handles come from the same load.
    pub fn same_as(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("detector", &self.inner.detector.name())
            .field("kind", &self.inner.kind)
            .field("warmed_up", &self.inner.warmed_up)
            .field("loaded_at", &self.inner.loaded_at)
            .finish()
    }
}

/// Owns the detector handle and the lookup tables.
pub struct ModelManager {
    config: Arc<DetectionConfig>,
    loader: Arc<dyn DetectorLoader>,
    handle: RwLock<Option<ModelHandle>>,
    load_gate: Mutex<()>,
    load_count: AtomicUsize,
    class_table: OnceCell<Arc<ClassTable>>,
    allow_list: OnceCell<Arc<FoodAllowList>>,
    nutrition: OnceCell<Arc<NutritionTable>>,
    translations: OnceCell<Arc<NameTranslations>>,
}

impl ModelManager {
    /// Create a new model manager using the ONNX loader
    pub fn new(config: Arc<DetectionConfig>) -> Self {
        Self::with_loader(config, Arc::new(OnnxLoader))
    }

    pub fn with_loader(config: Arc<DetectionConfig>, loader: Arc<dyn DetectorLoader>) -> Self {
        Self {
            config,
            loader,
            handle: RwLock::new(None),
            load_gate: Mutex::new(()),
            load_count: AtomicUsize::new(0),
            class_table: OnceCell::new(),
            allow_list: OnceCell::new(),
            nutrition: OnceCell::new(),
            translations: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Return the loaded handle, loading it first if needed.
    ///
    /// Concurrent callers during a load wait for it and share its handle.
    /// Detector failures degrade to the placeholder; only table errors are
    /// returned.
    pub async fn ensure_loaded(&self) -> Result<ModelHandle, VisionError> {
        if let Some(handle) = self.current() {
            return Ok(handle);
        }

        let _gate = self.load_gate.lock().await;
        if let Some(handle) = self.current() {
            return Ok(handle);
        }

        self.class_table().await?;
        self.allow_list().await?;
        self.nutrition_table().await?;
        self.translations().await?;

        let handle = self.load_detector().await;
        *self.handle.write() = Some(handle.clone());
        Ok(handle)
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.read().is_some()
    }

    /// Drop the handle; the next `ensure_loaded` loads again.
    pub fn unload(&self) {
        if self.handle.write().take().is_some() {
            info!("Detector unloaded");
        }
    }

    /// Number of times the detector load routine has run.
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub async fn class_table(&self) -> Result<Arc<ClassTable>, VisionError> {
        self.class_table
            .get_or_try_init(|| async { self.load_class_table().map(Arc::new) })
            .await
            .cloned()
    }

    pub async fn allow_list(&self) -> Result<Arc<FoodAllowList>, VisionError> {
        let class_count = self.class_table().await?.len();
        self.allow_list
            .get_or_try_init(|| async { FoodAllowList::builtin(class_count).map(Arc::new) })
            .await
            .cloned()
    }

    pub async fn nutrition_table(&self) -> Result<Arc<NutritionTable>, VisionError> {
        let path = self.config.nutrition_table_path.as_deref();
        self.nutrition
            .get_or_try_init(|| async { NutritionTable::load(path).map(Arc::new) })
            .await
            .cloned()
    }

    pub async fn translations(&self) -> Result<Arc<NameTranslations>, VisionError> {
        self.translations
            .get_or_try_init(|| async { NameTranslations::builtin().map(Arc::new) })
            .await
            .cloned()
    }

    fn load_class_table(&self) -> Result<ClassTable, VisionError> {
        let override_path = self.config.class_names_path.as_deref();
        match ClassTable::load(override_path, self.config.num_classes) {
            Err(e) if override_path.is_some() => {
                warn!("Class names override unusable ({}), using embedded list", e);
                ClassTable::embedded(self.config.num_classes)
            }
            other => other,
        }
    }

    fn current(&self) -> Option<ModelHandle> {
        self.handle.read().clone()
    }

    async fn load_detector(&self) -> ModelHandle {
        let attempt = self.load_count.fetch_add(1, Ordering::SeqCst) + 1;
        let config = Arc::clone(&self.config);
        let loader = Arc::clone(&self.loader);
        let started = Instant::now();

        debug!(attempt, "Loading detector");
        let outcome = tokio::task::spawn_blocking(move || {
            let detector = loader.load(&config)?;
            warm_up(detector.as_ref())?;
            Ok::<_, VisionError>(detector)
        })
        .await
        .map_err(|e| VisionError::Model(format!("Loader task failed: {}", e)))
        .and_then(|r| r);

        match outcome {
            Ok(detector) => {
                info!(
                    detector = detector.name(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Detector loaded and warmed up"
                );
                ModelHandle::new(detector, ModelKind::Onnx, true)
            }
            Err(e) => {
                warn!("Detector unavailable ({}), using placeholder", e);
                self.load_placeholder().await
            }
        }
    }

    async fn load_placeholder(&self) -> ModelHandle {
        let placeholder: Arc<dyn Detector> = Arc::new(PlaceholderDetector::new(&self.config));
        let detector = Arc::clone(&placeholder);
        let warmed_up = tokio::task::spawn_blocking(move || warm_up(detector.as_ref()))
            .await
            .map_err(|e| VisionError::Model(format!("Warm-up task failed: {}", e)))
            .and_then(|r| r);

        if let Err(e) = &warmed_up {
            warn!("Placeholder warm-up failed: {}", e);
        }
        ModelHandle::new(placeholder, ModelKind::Placeholder, warmed_up.is_ok())
    }
}

fn warm_up(detector: &dyn Detector) -> Result<(), VisionError> {
    let input = InputTensor::zeros(detector.input_size());
    let predictions = detector.predict(&input)?;
    debug!("Warm-up produced {:?}", predictions.shape());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::detector::{FixedDetector, StaticLoader};
    use crate::tensor::RawPredictions;
    use std::time::Duration;

    fn small_config() -> DetectionConfig {
        DetectionConfig {
            model_path: "/nonexistent/model.onnx".into(),
            input_size: 8,
            placeholder_anchors: 4,
            ..Default::default()
        }
    }

    fn fixed_loader() -> Arc<dyn DetectorLoader> {
        let detector = FixedDetector::single((0.5, 0.5), (0.4, 0.4), 10, 0.9, 601, 8).unwrap();
        Arc::new(StaticLoader::new(Arc::new(detector)))
    }

    struct SlowLoader {
        inner: Arc<dyn DetectorLoader>,
    }

    impl DetectorLoader for SlowLoader {
        fn load(&self, config: &DetectionConfig) -> Result<Arc<dyn Detector>, VisionError> {
            std::thread::sleep(Duration::from_millis(50));
            self.inner.load(config)
        }
    }

    struct BrokenDetector;

    impl Detector for BrokenDetector {
        fn name(&self) -> &str {
            "broken"
        }

        fn input_size(&self) -> usize {
            8
        }

        fn predict(&self, _input: &InputTensor) -> Result<RawPredictions, VisionError> {
            Err(VisionError::Inference("broken".to_string()))
        }
    }

    #[tokio::test]
    async fn test_missing_model_falls_back_to_placeholder() {
        let manager = ModelManager::new(Arc::new(small_config()));
        let handle = manager.ensure_loaded().await.unwrap();
        assert!(handle.is_placeholder());
        assert!(handle.is_warmed_up());
        assert_eq!(manager.load_count(), 1);
        assert!(manager.is_loaded());
    }

    #[tokio::test]
    async fn test_loader_detector_is_warmed_up() {
        let manager = ModelManager::with_loader(Arc::new(small_config()), fixed_loader());
        let handle = manager.ensure_loaded().await.unwrap();
        assert_eq!(handle.kind(), ModelKind::Onnx);
        assert!(handle.is_warmed_up());
    }

    #[tokio::test]
    async fn test_warm_up_failure_falls_back() {
        let loader = Arc::new(StaticLoader::new(Arc::new(BrokenDetector)));
        let manager = ModelManager::with_loader(Arc::new(small_config()), loader);
        let handle = manager.ensure_loaded().await.unwrap();
        assert!(handle.is_placeholder());
        assert!(handle.is_warmed_up());
    }

    #[tokio::test]
    async fn test_sequential_calls_reuse_handle() {
        let manager = ModelManager::with_loader(Arc::new(small_config()), fixed_loader());
        let a = manager.ensure_loaded().await.unwrap();
        let b = manager.ensure_loaded().await.unwrap();
        assert!(a.same_as(&b));
        assert_eq!(manager.load_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_calls_single_flight() {
        let loader = Arc::new(SlowLoader {
            inner: fixed_loader(),
        });
        let manager = Arc::new(ModelManager::with_loader(Arc::new(small_config()), loader));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = Arc::clone(&manager);
                tokio::spawn(async move { manager.ensure_loaded().await.unwrap() })
            })
            .collect();

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }
        assert!(handles.windows(2).all(|w| w[0].same_as(&w[1])));
        assert_eq!(manager.load_count(), 1);
    }

    #[tokio::test]
    async fn test_unload_triggers_reload() {
        let manager = ModelManager::with_loader(Arc::new(small_config()), fixed_loader());
        let first = manager.ensure_loaded().await.unwrap();
        manager.unload();
        assert!(!manager.is_loaded());

        let second = manager.ensure_loaded().await.unwrap();
        assert!(!first.same_as(&second));
        assert_eq!(manager.load_count(), 2);
    }

    #[tokio::test]
    async fn test_tables_are_cached() {
        let manager = ModelManager::new(Arc::new(small_config()));
        let a = manager.nutrition_table().await.unwrap();
        let b = manager.nutrition_table().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.class_table().await.unwrap().len(), 601);
        assert_eq!(manager.allow_list().await.unwrap().len(), 78);
    }

    #[tokio::test]
    async fn test_bad_class_override_uses_embedded() {
        let config = DetectionConfig {
            class_names_path: Some("/nonexistent/classes.txt".into()),
            ..small_config()
        };
        let manager = ModelManager::new(Arc::new(config));
        assert_eq!(manager.class_table().await.unwrap().len(), 601);
    }
}
