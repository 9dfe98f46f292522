//! Bounded pool of recognizer instances.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::{PoolError, RecognitionError};
use crate::models::config::{DocfieldConfig, RecognizerSettings};

use super::{ImageSource, Recognition, Recognizer, RetryPolicy, create_recognizer};

/// Builds one recognizer instance from the pool's settings.
pub type RecognizerFactory =
    Box<dyn Fn(&RecognizerSettings) -> Result<Arc<dyn Recognizer>, RecognitionError> + Send + Sync>;

/// Pool of at most `max_instances` recognizers.
///
/// Instances are built on demand: each acquire constructs a new one until
/// the bound is reached, after which existing instances are handed out in
/// round-robin order. The pool is shared by reference (`Arc`) between
/// callers; after [`shutdown`](Self::shutdown) no instance is handed out.
pub struct RecognizerPool {
    instances: Mutex<Vec<Arc<dyn Recognizer>>>,
    max_instances: usize,
    next: AtomicUsize,
    shut_down: AtomicBool,
    settings: RecognizerSettings,
    factory: RecognizerFactory,
    retry: RetryPolicy,
}

impl RecognizerPool {
    /// Create an empty pool. No recognizer is built until the first acquire.
    pub fn new(
        max_instances: usize,
        settings: RecognizerSettings,
        factory: RecognizerFactory,
    ) -> Result<Self, PoolError> {
        if max_instances == 0 {
            return Err(PoolError::EmptyPool);
        }

        Ok(Self {
            instances: Mutex::new(Vec::with_capacity(max_instances)),
            max_instances,
            next: AtomicUsize::new(0),
            shut_down: AtomicBool::new(false),
            settings,
            factory,
            retry: RetryPolicy::default(),
        })
    }

    /// Create a pool for the configured backend and retry policy.
    pub fn from_config(config: &DocfieldConfig) -> Result<Self, PoolError> {
        let backend = config.pool.backend;
        let pool = Self::new(
            config.pool.max_instances,
            config.pool.recognizer.clone(),
            Box::new(move |settings| create_recognizer(backend, settings)),
        )?;
        Ok(pool.with_retry(RetryPolicy::from_config(&config.retry)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Recognizer>>> {
        self.instances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand out a recognizer, constructing one while below the bound.
    pub fn acquire(&self) -> Result<Arc<dyn Recognizer>, PoolError> {
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        let mut instances = self.lock();
        // Shutdown may have drained the pool while we waited for the lock.
        if self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        if instances.len() < self.max_instances {
            let recognizer = (self.factory)(&self.settings).map_err(PoolError::Construction)?;
            instances.push(Arc::clone(&recognizer));
            info!(
                "Created {} recognizer ({}/{})",
                recognizer.name(),
                instances.len(),
                self.max_instances
            );
            return Ok(recognizer);
        }

        let index = self.next.fetch_add(1, Ordering::Relaxed) % instances.len();
        debug!("Reusing recognizer {}", index);
        Ok(Arc::clone(&instances[index]))
    }

    /// Acquire a recognizer and run it on `source`, retrying transient
    /// failures according to the pool's retry policy.
    pub fn recognize(&self, source: &ImageSource) -> Result<Recognition, crate::DocfieldError> {
        let recognizer = self.acquire()?;
        let recognition = self.retry.run(|attempt| {
            debug!(
                "Recognizing {} with {} (attempt {})",
                source.describe(),
                recognizer.name(),
                attempt
            );
            recognizer.recognize(source)
        })?;
        Ok(recognition)
    }

    /// Number of constructed instances.
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn max_instances(&self) -> usize {
        self.max_instances
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Terminate every instance and refuse further acquires. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let drained: Vec<Arc<dyn Recognizer>> = self.lock().drain(..).collect();
        for recognizer in &drained {
            recognizer.terminate();
        }
        info!("Recognizer pool shut down ({} instances terminated)", drained.len());
    }
}

impl Drop for RecognizerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct CountingRecognizer {
        id: usize,
        terminated: Arc<AtomicUsize>,
        failures_left: AtomicUsize,
    }

    impl Recognizer for CountingRecognizer {
        fn name(&self) -> &str {
            "counting"
        }

        fn recognize(&self, _source: &ImageSource) -> Result<Recognition, RecognitionError> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(RecognitionError::Engine("busy".into()));
            }
            Ok(Recognition::new(format!("instance {}", self.id), 90.0))
        }

        fn terminate(&self) {
            self.terminated.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Counters {
        built: Arc<AtomicUsize>,
        terminated: Arc<AtomicUsize>,
    }

    fn pool(max: usize, failures: usize) -> (RecognizerPool, Counters) {
        let built = Arc::new(AtomicUsize::new(0));
        let terminated = Arc::new(AtomicUsize::new(0));
        let counters = Counters {
            built: Arc::clone(&built),
            terminated: Arc::clone(&terminated),
        };
        let factory: RecognizerFactory = Box::new(move |_| {
            let id = built.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingRecognizer {
                id,
                terminated: Arc::clone(&terminated),
                failures_left: AtomicUsize::new(failures),
            }) as Arc<dyn Recognizer>)
        });
        let pool = RecognizerPool::new(max, RecognizerSettings::default(), factory)
            .unwrap()
            .with_retry(RetryPolicy::new(2, Duration::ZERO));
        (pool, counters)
    }

    #[test]
    fn test_instances_built_lazily() {
        let (pool, counters) = pool(2, 0);
        assert_eq!(pool.size(), 0);
        assert_eq!(counters.built.load(Ordering::SeqCst), 0);

        pool.acquire().unwrap();
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_size_is_bounded_and_round_robin() {
        let (pool, counters) = pool(2, 0);
        let source = ImageSource::buffer(Vec::new());

        let texts: Vec<String> = (0..5)
            .map(|_| pool.recognize(&source).unwrap().text)
            .collect();

        assert_eq!(pool.size(), 2);
        assert_eq!(counters.built.load(Ordering::SeqCst), 2);
        assert_eq!(
            texts,
            vec!["instance 0", "instance 1", "instance 0", "instance 1", "instance 0"]
        );
    }

    #[test]
    fn test_concurrent_acquire_respects_bound() {
        let (pool, counters) = pool(3, 0);
        let pool = Arc::new(pool);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || pool.acquire().map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(pool.size(), 3);
        assert_eq!(counters.built.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (pool, counters) = pool(2, 0);
        pool.acquire().unwrap();
        pool.acquire().unwrap();

        pool.shutdown();
        pool.shutdown();

        assert_eq!(counters.terminated.load(Ordering::SeqCst), 2);
        assert_eq!(pool.size(), 0);
        assert!(matches!(pool.acquire(), Err(PoolError::ShutDown)));

        drop(pool);
        assert_eq!(counters.terminated.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_recognize_retries_transient_failures() {
        let (pool, _) = pool(1, 2);
        let recognition = pool.recognize(&ImageSource::buffer(Vec::new())).unwrap();
        assert_eq!(recognition.text, "instance 0");
    }

    #[test]
    fn test_recognize_gives_up_after_retries() {
        let (pool, _) = pool(1, 3);
        assert!(pool.recognize(&ImageSource::buffer(Vec::new())).is_err());
    }

    #[test]
    fn test_zero_instances_rejected() {
        let factory: RecognizerFactory = Box::new(|_| Err(RecognitionError::Engine("unused".into())));
        assert!(matches!(
            RecognizerPool::new(0, RecognizerSettings::default(), factory),
            Err(PoolError::EmptyPool)
        ));
    }

    #[test]
    fn test_construction_failure_is_reported() {
        let factory: RecognizerFactory = Box::new(|_| Err(RecognitionError::Engine("no binary".into())));
        let pool = RecognizerPool::new(1, RecognizerSettings::default(), factory).unwrap();
        assert!(matches!(pool.acquire(), Err(PoolError::Construction(_))));
        assert_eq!(pool.size(), 0);
    }
}
